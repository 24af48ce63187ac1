use sys_locale::get_locale;

use crate::models::SubmitMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Pt,
    En,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub placeholder: &'static str,
    pub add_task: &'static str,
    pub update_task: &'static str,
    pub empty_list: &'static str,
}

impl Labels {
    pub fn submit(&self, mode: SubmitMode) -> &'static str {
        match mode {
            SubmitMode::Add => self.add_task,
            SubmitMode::Update => self.update_task,
        }
    }
}

/// `pt`/`en` pick a language directly; anything else asks the OS.
pub fn resolve_language(language: &str) -> Language {
    let normalized = language.trim().to_lowercase();
    match normalized.as_str() {
        "pt" => Language::Pt,
        "en" => Language::En,
        _ => detect_system_language(),
    }
}

fn detect_system_language() -> Language {
    language_from_locale(&get_locale().unwrap_or_default())
}

fn language_from_locale(locale: &str) -> Language {
    if locale.to_lowercase().starts_with("pt") {
        Language::Pt
    } else {
        Language::En
    }
}

pub fn labels(lang: Language) -> Labels {
    match lang {
        Language::Pt => Labels {
            title: "Lista de tarefas",
            subtitle: "Adicione tarefas",
            placeholder: "Adicionar tarefa",
            add_task: "Adicionar tarefa",
            update_task: "Atualizar tarefa",
            empty_list: "Nenhuma tarefa",
        },
        Language::En => Labels {
            title: "Task list",
            subtitle: "Add some tasks",
            placeholder: "New task",
            add_task: "Add Task",
            update_task: "Update Task",
            empty_list: "No tasks",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_languages_skip_locale_detection() {
        assert_eq!(resolve_language("pt"), Language::Pt);
        assert_eq!(resolve_language(" EN "), Language::En);
    }

    #[test]
    fn locale_prefix_selects_portuguese() {
        assert_eq!(language_from_locale("pt-BR"), Language::Pt);
        assert_eq!(language_from_locale("PT_pt"), Language::Pt);
        assert_eq!(language_from_locale("en-US"), Language::En);
        assert_eq!(language_from_locale(""), Language::En);
    }

    #[test]
    fn submit_label_follows_mode() {
        let en = labels(Language::En);
        assert_eq!(en.submit(SubmitMode::Add), "Add Task");
        assert_eq!(en.submit(SubmitMode::Update), "Update Task");
        let pt = labels(Language::Pt);
        assert_eq!(pt.title, "Lista de tarefas");
        assert_eq!(pt.submit(SubmitMode::Update), "Atualizar tarefa");
    }
}
