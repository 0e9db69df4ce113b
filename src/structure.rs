// Project tree overview written to structure.md after each scan

use std::collections::BTreeMap;

/// Width of the file name column before the `# description` comment
const NAME_COLUMN: usize = 30;

/// One indexed file and its summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Path relative to the project root, `/` separated
    pub path: String,
    pub description: String,
}

impl TreeEntry {
    pub fn new(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
        }
    }
}

#[derive(Default)]
struct DirNode<'a> {
    files: BTreeMap<&'a str, &'a str>,
    dirs: BTreeMap<&'a str, DirNode<'a>>,
}

impl<'a> DirNode<'a> {
    fn insert(&mut self, path: &'a str, description: &'a str) {
        match path.split_once('/') {
            Some((dir, rest)) if !dir.is_empty() => {
                self.dirs.entry(dir).or_default().insert(rest, description)
            }
            Some((_, rest)) => self.insert(rest, description),
            None => {
                self.files.insert(path, description);
            }
        }
    }
}

/// Render `entries` as a tree below `root_name/`. Within a directory files
/// come first, then subdirectories, both sorted by name.
pub fn render_tree(root_name: &str, entries: &[TreeEntry]) -> String {
    let mut root = DirNode::default();
    for entry in entries {
        root.insert(&entry.path, &entry.description);
    }

    let mut out = format!("{}/\n", root_name);
    render_dir(&root, "", &mut out);
    out
}

fn render_dir(node: &DirNode, prefix: &str, out: &mut String) {
    let total = node.files.len() + node.dirs.len();
    let mut position = 0;

    for (name, description) in &node.files {
        position += 1;
        let connector = if position == total { "└──" } else { "├──" };
        // Multi-line summaries would break the tree
        let description = description.split_whitespace().collect::<Vec<_>>().join(" ");
        out.push_str(&format!(
            "{}{} {:<width$} # {}\n",
            prefix,
            connector,
            name,
            description,
            width = NAME_COLUMN
        ));
    }

    for (name, child) in &node.dirs {
        position += 1;
        let last = position == total;
        let connector = if last { "└──" } else { "├──" };
        out.push_str(&format!("{}{} {}/\n", prefix, connector, name));

        let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
        render_dir(child, &child_prefix, out);
    }
}
