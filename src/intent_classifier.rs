use crate::config::KeywordConfig;
use crate::task::{Intent, Task};

const LIST_KEYWORDS: &[&str] = &[
    "show", "list", "what's on", "whats on", "what is on", "fetch", "get", "view", "check",
    "upcoming", "display", "see my",
];
const CREATE_KEYWORDS: &[&str] = &[
    "schedule", "create", "add", "book", "make", "set up", "arrange", "plan",
];
const DELETE_KEYWORDS: &[&str] = &["delete", "remove", "cancel"];
/// Only consulted when the task names an existing event
const UPDATE_KEYWORDS: &[&str] = &["update", "edit", "reschedule", "move", "change", "rename"];

const LIST_TYPES: &[&str] = &["list", "show", "fetch", "get"];
const DELETE_TYPES: &[&str] = &["delete", "remove"];
const CREATE_TYPES: &[&str] = &["create", "add", "schedule"];
const UPDATE_TYPES: &[&str] = &["update", "edit", "reschedule", "modify"];

/// Parameter names that count as a pre-parsed event window
const START_KEYS: &[&str] = &["start_time", "start"];
const END_KEYS: &[&str] = &["end_time", "end"];
const EVENT_ID_KEYS: &[&str] = &["event_id"];

/// Keyword sets used to read a description
#[derive(Debug, Clone)]
pub struct KeywordTables {
    pub list: Vec<String>,
    pub create: Vec<String>,
    pub delete: Vec<String>,
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self {
            list: to_owned(LIST_KEYWORDS),
            create: to_owned(CREATE_KEYWORDS),
            delete: to_owned(DELETE_KEYWORDS),
        }
    }
}

impl KeywordTables {
    /// Built-in tables extended with configured phrases
    pub fn with_extra(extra: &KeywordConfig) -> Self {
        let mut tables = Self::default();
        tables.list.extend(extra.list.iter().map(|k| k.to_lowercase()));
        tables.create.extend(extra.create.iter().map(|k| k.to_lowercase()));
        tables.delete.extend(extra.delete.iter().map(|k| k.to_lowercase()));
        tables
    }
}

fn to_owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Everything the rules look at, computed once per task
#[derive(Debug, Clone, Default)]
pub struct Signals {
    pub blank: bool,
    pub has_event_window: bool,
    pub has_event_id: bool,
    pub list_hit: bool,
    pub create_hit: bool,
    pub delete_hit: bool,
    pub update_hit: bool,
    pub task_type: String,
}

impl Signals {
    fn type_contains(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.task_type.contains(w))
    }
}

type Predicate = fn(&Signals) -> bool;

fn blank_task(s: &Signals) -> bool {
    s.blank
}
fn window_with_delete(s: &Signals) -> bool {
    s.has_event_window && s.delete_hit
}
fn targeted_delete(s: &Signals) -> bool {
    s.has_event_id && s.type_contains(DELETE_TYPES)
}
fn targeted_update(s: &Signals) -> bool {
    s.has_event_id && (s.type_contains(UPDATE_TYPES) || s.update_hit)
}
fn window(s: &Signals) -> bool {
    s.has_event_window
}
fn list_phrasing(s: &Signals) -> bool {
    s.list_hit && !s.create_hit
}
fn list_type(s: &Signals) -> bool {
    s.type_contains(LIST_TYPES)
}
fn delete_type(s: &Signals) -> bool {
    s.type_contains(DELETE_TYPES)
}
fn create_type(s: &Signals) -> bool {
    s.type_contains(CREATE_TYPES)
}
fn update_type(s: &Signals) -> bool {
    s.type_contains(UPDATE_TYPES)
}
fn any_list_phrase(s: &Signals) -> bool {
    s.list_hit
}
fn always(_: &Signals) -> bool {
    true
}

/// Evaluated top to bottom; the first matching predicate decides.
const RULES: &[(Predicate, Intent)] = &[
    (blank_task, Intent::Unknown),
    (window_with_delete, Intent::Delete),
    (targeted_delete, Intent::Delete),
    (targeted_update, Intent::Update),
    (window, Intent::Create),
    (list_phrasing, Intent::List),
    (list_type, Intent::List),
    (delete_type, Intent::Delete),
    (create_type, Intent::Create),
    (update_type, Intent::Update),
    (any_list_phrase, Intent::List),
    (always, Intent::Create),
];

/// Decides what a calendar task asks for
#[derive(Debug, Clone, Default)]
pub struct IntentClassifier {
    keywords: KeywordTables,
}

impl IntentClassifier {
    pub fn new(keywords: KeywordTables) -> Self {
        Self { keywords }
    }

    pub fn signals(&self, task: &Task) -> Signals {
        let description = task.description.to_lowercase();
        let has_key = |keys: &[&str]| {
            keys.iter().any(|k| {
                task.parameters
                    .get(*k)
                    .map(|v| !v.is_null() && v.as_str().map_or(true, |s| !s.trim().is_empty()))
                    .unwrap_or(false)
            })
        };

        Signals {
            blank: task.is_blank(),
            has_event_window: has_key(START_KEYS) && has_key(END_KEYS),
            has_event_id: has_key(EVENT_ID_KEYS),
            list_hit: contains_any(&description, &self.keywords.list),
            create_hit: contains_any(&description, &self.keywords.create),
            delete_hit: contains_any(&description, &self.keywords.delete),
            update_hit: UPDATE_KEYWORDS.iter().any(|k| contains_phrase(&description, k)),
            task_type: task.task_type.to_lowercase(),
        }
    }

    /// Whether the description uses any list, create or delete phrase
    pub fn mentions_keywords(&self, task: &Task) -> bool {
        let signals = self.signals(task);
        signals.list_hit || signals.create_hit || signals.delete_hit
    }

    pub fn classify(&self, task: &Task) -> Intent {
        let signals = self.signals(task);
        let intent = RULES
            .iter()
            .find(|(predicate, _)| predicate(&signals))
            .map(|(_, intent)| *intent)
            .unwrap_or(Intent::Create);
        log::debug!("Classified task '{}' as {} ({:?})", task.description, intent, signals);
        intent
    }
}

/// Whole-word containment, so "get" does not fire on "budget"
fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| contains_phrase(text, k))
}

fn contains_phrase(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    text.match_indices(phrase).any(|(start, _)| {
        let end = start + phrase.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        !before.map_or(false, char::is_alphanumeric) && !after.map_or(false, char::is_alphanumeric)
    })
}
