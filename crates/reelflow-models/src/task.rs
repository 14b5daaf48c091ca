//! Task descriptors and the controller document that holds them.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Argument that marks a task as category-driven.
pub const CATEGORY_FLAG: &str = "--category";

/// Flag used to hand the controller document location to a task.
pub const CONTROLLER_FLAG: &str = "--controller";

/// A pre-configured external script invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskDescriptor {
    /// Script path, relative to the project root unless absolute
    #[serde(default)]
    pub script: Option<String>,

    /// Arguments passed after the script
    #[serde(default)]
    pub args: Vec<String>,

    /// Interpreter used to run the script (e.g. `python3`); `None` runs the script directly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,

    /// Arguments placed between the interpreter and the script
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interpreter_args: Vec<String>,

    /// Keys the supervisor does not interpret, kept so saves do not drop them
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TaskDescriptor {
    /// Create a descriptor for a script with arguments.
    pub fn new<I, S>(script: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Some(script.into()),
            args: args.into_iter().map(Into::into).collect(),
            interpreter: None,
            interpreter_args: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Set the interpreter.
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    /// Script path, treating an empty string as missing.
    pub fn script_path(&self) -> Option<&str> {
        self.script.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Only category-driven tasks receive the controller location.
    pub fn needs_controller_arg(&self) -> bool {
        self.args.iter().any(|a| a == CATEGORY_FLAG)
    }

    /// Value following `flag` in the argument list, if any.
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        let index = self.args.iter().position(|a| a == flag)?;
        self.args.get(index + 1).map(String::as_str)
    }
}

/// Category setting naming the links file a category reads from.
const INPUT_TXT_FILE: &str = "input_txt_file";

/// Category setting selecting the link extractor.
const LINK_EXTRACTOR_TYPE: &str = "link_extractor_type";

/// Global setting mapping links-file names to their paths.
const TXT_FILE_MAP: &str = "txt_file_map";

/// Prefix of the keys under which a category's links are stored.
const LINK_KEY_PREFIX: &str = "post";

/// The controller document (`controller.json`).
///
/// Only `tasks` drives the supervisor. Categories, global settings and the
/// per-category link lists belong to the task scripts; the dashboard edits
/// them but never interprets them beyond the few keys named above. Unknown
/// top-level keys survive a load/save cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ControllerDocument {
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskDescriptor>,

    #[serde(default)]
    pub categories: BTreeMap<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub global_settings: serde_json::Value,

    /// Link lists of `simple` extractor categories, keyed `post1`, `post2`, ...
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub json_data: BTreeMap<String, serde_json::Value>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ControllerDocument {
    /// Look up a task descriptor.
    pub fn task(&self, name: &str) -> Option<&TaskDescriptor> {
        self.tasks.get(name)
    }

    /// Sorted task names.
    pub fn task_names(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    /// Sorted category names.
    pub fn category_names(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }

    /// Group tasks under each category, in category name order.
    ///
    /// A task belongs to a category when its trimmed, lowercased name contains
    /// the trimmed, lowercased category name. A task may appear in several
    /// categories.
    pub fn dashboard_modules(&self) -> Vec<DashboardModule> {
        self.categories
            .iter()
            .map(|(category, settings)| {
                let needle = category.trim().to_lowercase();
                let tasks = self
                    .tasks
                    .keys()
                    .filter(|task| task.trim().to_lowercase().contains(&needle))
                    .cloned()
                    .collect();

                let txt_file_path = settings
                    .get(INPUT_TXT_FILE)
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                let txt_file_name = txt_file_path.as_deref().and_then(|path| self.txt_file_name(path));

                DashboardModule {
                    name: category.clone(),
                    tasks,
                    txt_file_name,
                    txt_file_path,
                    can_edit_json: is_simple_extractor(settings),
                }
            })
            .collect()
    }

    /// Name under which `path` appears in the global links-file map.
    fn txt_file_name(&self, path: &str) -> Option<String> {
        self.global_settings
            .get(TXT_FILE_MAP)?
            .as_object()?
            .iter()
            .find(|(_, mapped)| mapped.as_str() == Some(path))
            .map(|(name, _)| name.clone())
    }

    /// Whether the category stores its links in this document.
    pub fn has_editable_links(&self, category: &str) -> bool {
        self.categories.get(category).is_some_and(is_simple_extractor)
    }

    /// Links stored for `category`, in `post<N>` order.
    ///
    /// Keys without a numeric suffix sort after the numbered ones.
    pub fn category_links(&self, category: &str) -> Vec<String> {
        let Some(entries) = self.json_data.get(category).and_then(|v| v.as_object()) else {
            return Vec::new();
        };

        let mut links: Vec<(Option<u64>, &String, &str)> = entries
            .iter()
            .filter_map(|(key, value)| {
                let index = key
                    .strip_prefix(LINK_KEY_PREFIX)
                    .and_then(|n| n.parse::<u64>().ok());
                value.as_str().map(|link| (index, key, link))
            })
            .collect();
        links.sort_by(|a, b| match (a.0, b.0) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.1.cmp(b.1),
        });

        links.into_iter().map(|(_, _, link)| link.to_string()).collect()
    }

    /// Replace the links stored for `category`.
    ///
    /// Entries are trimmed and blanks dropped; the rest are renumbered from
    /// `post1`.
    pub fn set_category_links<I, S>(&mut self, category: &str, links: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries: serde_json::Map<String, serde_json::Value> = links
            .into_iter()
            .filter_map(|link| {
                let link = link.as_ref().trim();
                (!link.is_empty()).then(|| link.to_string())
            })
            .enumerate()
            .map(|(i, link)| (format!("{}{}", LINK_KEY_PREFIX, i + 1), serde_json::Value::String(link)))
            .collect();

        self.json_data
            .insert(category.to_string(), serde_json::Value::Object(entries));
    }
}

fn is_simple_extractor(settings: &serde_json::Value) -> bool {
    settings.get(LINK_EXTRACTOR_TYPE).and_then(|v| v.as_str()) == Some("simple")
}

/// A dashboard category with its matching tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DashboardModule {
    pub name: String,
    pub tasks: Vec<String>,
    /// Key of the category's links file in the global `txt_file_map`
    pub txt_file_name: Option<String>,
    /// The category's `input_txt_file`
    pub txt_file_path: Option<String>,
    /// Links live in this document and can be edited from the dashboard
    pub can_edit_json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_document_parsing() {
        let json = r#"{
            "tasks": {
                "Build": {"script": "build.sh", "args": []},
                "Motivation Download": {"script": "scripts/download_reels.py", "args": ["--category", "Motivation"], "interpreter": "python3"}
            },
            "categories": {"Motivation": {"input_txt_file": "links.txt"}},
            "global_settings": {"ollama_timeout": 60}
        }"#;

        let doc: ControllerDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.task_names(), vec!["Build", "Motivation Download"]);

        let build = doc.task("Build").unwrap();
        assert_eq!(build.script_path(), Some("build.sh"));
        assert!(!build.needs_controller_arg());

        let download = doc.task("Motivation Download").unwrap();
        assert!(download.needs_controller_arg());
        assert_eq!(download.interpreter.as_deref(), Some("python3"));
        assert_eq!(download.arg_value("--category"), Some("Motivation"));
    }

    #[test]
    fn test_missing_script_is_none() {
        let doc: ControllerDocument =
            serde_json::from_str(r#"{"tasks": {"Empty": {"args": ["-v"]}, "Blank": {"script": "  "}}}"#).unwrap();
        assert_eq!(doc.task("Empty").unwrap().script_path(), None);
        assert_eq!(doc.task("Blank").unwrap().script_path(), None);
    }

    #[test]
    fn test_dashboard_modules_match_by_substring() {
        let mut doc = ControllerDocument::default();
        doc.tasks.insert("Motivation Upload".into(), TaskDescriptor::default());
        doc.tasks.insert("motivation download".into(), TaskDescriptor::default());
        doc.tasks.insert("Quotes Create".into(), TaskDescriptor::default());
        doc.categories.insert(" Motivation ".into(), serde_json::json!({}));
        doc.categories.insert("Cars".into(), serde_json::json!({}));

        let modules = doc.dashboard_modules();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].name, " Motivation ");
        assert_eq!(modules[0].tasks, vec!["Motivation Upload", "motivation download"]);
        assert_eq!(modules[1].name, "Cars");
        assert!(modules[1].tasks.is_empty());
    }

    #[test]
    fn test_dashboard_module_links_file() {
        let doc: ControllerDocument = serde_json::from_str(
            r#"{
                "tasks": {"Cars Download": {"script": "dl.py"}},
                "categories": {
                    "Cars": {"input_txt_file": "links/cars.txt", "link_extractor_type": "simple"},
                    "Quotes": {"input_txt_file": "links/unmapped.txt"},
                    "Art": {}
                },
                "global_settings": {"txt_file_map": {"Cars Links": "links/cars.txt"}}
            }"#,
        )
        .unwrap();

        let modules = doc.dashboard_modules();
        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Art", "Cars", "Quotes"]);

        let art = &modules[0];
        assert_eq!(art.txt_file_path, None);
        assert_eq!(art.txt_file_name, None);
        assert!(!art.can_edit_json);

        let cars = &modules[1];
        assert_eq!(cars.tasks, vec!["Cars Download"]);
        assert_eq!(cars.txt_file_path.as_deref(), Some("links/cars.txt"));
        assert_eq!(cars.txt_file_name.as_deref(), Some("Cars Links"));
        assert!(cars.can_edit_json);

        let quotes = &modules[2];
        assert_eq!(quotes.txt_file_path.as_deref(), Some("links/unmapped.txt"));
        assert_eq!(quotes.txt_file_name, None);
        assert!(!quotes.can_edit_json);
    }

    #[test]
    fn test_category_links_follow_post_numbering() {
        let doc: ControllerDocument = serde_json::from_str(
            r#"{"json_data": {"Cars": {"post10": "j", "post2": "b", "post1": "a", "extra": "z"}}}"#,
        )
        .unwrap();
        assert_eq!(doc.category_links("Cars"), vec!["a", "b", "j", "z"]);
        assert!(doc.category_links("Boats").is_empty());
    }

    #[test]
    fn test_set_category_links_renumbers() {
        let mut doc = ControllerDocument::default();
        doc.set_category_links("Cars", ["  https://a ", "", "https://b"]);

        assert_eq!(
            doc.json_data["Cars"],
            serde_json::json!({"post1": "https://a", "post2": "https://b"})
        );
        assert_eq!(doc.category_links("Cars"), vec!["https://a", "https://b"]);
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let json = r#"{
            "tasks": {"Build": {"script": "build.sh", "timeout": 30}},
            "schedule_defaults": {"frequency_days": 1}
        }"#;
        let doc: ControllerDocument = serde_json::from_str(json).unwrap();
        let saved = serde_json::to_value(&doc).unwrap();

        assert_eq!(saved["schedule_defaults"]["frequency_days"], 1);
        assert_eq!(saved["tasks"]["Build"]["timeout"], 30);
        assert!(saved.get("global_settings").is_none());
        assert!(saved.get("json_data").is_none());
    }

    #[test]
    fn test_arg_value_without_trailing_value() {
        let descriptor = TaskDescriptor::new("x.py", ["--image-dir"]);
        assert_eq!(descriptor.arg_value("--image-dir"), None);
        assert_eq!(descriptor.arg_value("--audio-dir"), None);
    }
}
