// Symbol extraction with tree-sitter
// Collects function and class-like names per file for the keyword index

use anyhow::{Context, Result};
use std::path::Path;
use tree_sitter::{Language, Node, Parser};

/// Languages the symbol parser understands, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    Python,
    Rust,
    TypeScript,
    Tsx,
}

impl SourceLanguage {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str())? {
            "py" | "pyi" => Some(Self::Python),
            "rs" => Some(Self::Rust),
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            _ => None,
        }
    }

    fn grammar(self) -> Language {
        match self {
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::Rust => tree_sitter_rust::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    /// Fence tag used when the file is quoted in a prompt
    pub fn fence_tag(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Rust => "rust",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
        }
    }
}

/// Function and class names defined in one file, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Symbols {
    pub functions: Vec<String>,
    pub classes: Vec<String>,
}

enum SymbolKind {
    Function,
    Class,
}

pub struct SymbolParser {
    parser: Parser,
}

impl SymbolParser {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// Extract symbols from `source`. Unsupported extensions give no symbols;
    /// tree-sitter recovers from syntax errors, so broken files still yield
    /// whatever definitions parse.
    pub fn extract(&mut self, path: &Path, source: &str) -> Result<Symbols> {
        let Some(language) = SourceLanguage::from_path(path) else {
            return Ok(Symbols::default());
        };

        self.parser
            .set_language(&language.grammar())
            .with_context(|| format!("Failed to set {:?} grammar", language))?;

        let tree = self
            .parser
            .parse(source, None)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let mut symbols = Symbols::default();
        traverse_node(tree.root_node(), source, language, &mut symbols);
        Ok(symbols)
    }
}

impl Default for SymbolParser {
    fn default() -> Self {
        Self::new()
    }
}

fn traverse_node(node: Node, source: &str, language: SourceLanguage, symbols: &mut Symbols) {
    if let Some((kind, name)) = definition(node, source, language) {
        let list = match kind {
            SymbolKind::Function => &mut symbols.functions,
            SymbolKind::Class => &mut symbols.classes,
        };
        if !list.contains(&name) {
            list.push(name);
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        traverse_node(child, source, language, symbols);
    }
}

fn definition(node: Node, source: &str, language: SourceLanguage) -> Option<(SymbolKind, String)> {
    let kind = match (language, node.kind()) {
        (SourceLanguage::Python, "function_definition") => SymbolKind::Function,
        (SourceLanguage::Python, "class_definition") => SymbolKind::Class,

        (SourceLanguage::Rust, "function_item" | "function_signature_item") => SymbolKind::Function,
        (SourceLanguage::Rust, "struct_item" | "enum_item" | "trait_item" | "union_item") => {
            SymbolKind::Class
        }

        (
            SourceLanguage::TypeScript | SourceLanguage::Tsx,
            "function_declaration" | "generator_function_declaration" | "method_definition",
        ) => SymbolKind::Function,
        (
            SourceLanguage::TypeScript | SourceLanguage::Tsx,
            "class_declaration" | "abstract_class_declaration" | "interface_declaration",
        ) => SymbolKind::Class,
        // const handler = () => {...}
        (SourceLanguage::TypeScript | SourceLanguage::Tsx, "variable_declarator") => {
            let value = node.child_by_field_name("value")?;
            if !matches!(value.kind(), "arrow_function" | "function_expression" | "function") {
                return None;
            }
            SymbolKind::Function
        }

        _ => return None,
    };

    let name = node.child_by_field_name("name")?;
    let text = name.utf8_text(source.as_bytes()).ok()?;
    Some((kind, text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_detection() {
        assert_eq!(
            SourceLanguage::from_path(Path::new("a/b.py")),
            Some(SourceLanguage::Python)
        );
        assert_eq!(
            SourceLanguage::from_path(Path::new("lib.rs")),
            Some(SourceLanguage::Rust)
        );
        assert_eq!(
            SourceLanguage::from_path(Path::new("App.tsx")),
            Some(SourceLanguage::Tsx)
        );
        assert_eq!(SourceLanguage::from_path(Path::new("README.md")), None);
        assert_eq!(SourceLanguage::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_python_symbols() {
        let source = r#"
import os

def add_vectors(a, b):
    return [x + y for x, y in zip(a, b)]

class Matrix:
    def __init__(self, rows):
        self.rows = rows

    @property
    def shape(self):
        return len(self.rows)

async def fetch():
    pass
"#;
        let mut parser = SymbolParser::new();
        let symbols = parser.extract(Path::new("utils/math_ops.py"), source).unwrap();
        assert_eq!(
            symbols.functions,
            vec!["add_vectors", "__init__", "shape", "fetch"]
        );
        assert_eq!(symbols.classes, vec!["Matrix"]);
    }

    #[test]
    fn test_rust_symbols() {
        let source = r#"
pub struct Store { items: Vec<u32> }
enum Mode { A, B }
pub trait Backend { fn open(&self) -> bool; }

impl Store {
    pub fn new() -> Self { Self { items: Vec::new() } }
}

fn helper() {}
"#;
        let mut parser = SymbolParser::new();
        let symbols = parser.extract(Path::new("src/store.rs"), source).unwrap();
        assert_eq!(symbols.functions, vec!["open", "new", "helper"]);
        assert_eq!(symbols.classes, vec!["Store", "Mode", "Backend"]);
    }

    #[test]
    fn test_typescript_symbols() {
        let source = r#"
export function loadUser(id: string) { return id; }
interface UserProps { name: string }
class UserService {
  fetchAll() { return []; }
}
const formatName = (name: string) => name.trim();
const LIMIT = 10;
"#;
        let mut parser = SymbolParser::new();
        let symbols = parser.extract(Path::new("src/user.ts"), source).unwrap();
        assert_eq!(symbols.functions, vec!["loadUser", "fetchAll", "formatName"]);
        assert_eq!(symbols.classes, vec!["UserProps", "UserService"]);
    }

    #[test]
    fn test_parser_is_reusable_across_languages() {
        let mut parser = SymbolParser::new();
        let py = parser.extract(Path::new("a.py"), "def one():\n    pass\n").unwrap();
        let rs = parser.extract(Path::new("b.rs"), "fn two() {}\n").unwrap();
        let py_again = parser.extract(Path::new("c.py"), "class Three:\n    pass\n").unwrap();

        assert_eq!(py.functions, vec!["one"]);
        assert_eq!(rs.functions, vec!["two"]);
        assert_eq!(py_again.classes, vec!["Three"]);
    }

    #[test]
    fn test_unsupported_and_empty_sources() {
        let mut parser = SymbolParser::new();
        assert_eq!(
            parser.extract(Path::new("notes.txt"), "def nope(): pass").unwrap(),
            Symbols::default()
        );
        assert_eq!(
            parser.extract(Path::new("empty.py"), "").unwrap(),
            Symbols::default()
        );
    }

    #[test]
    fn test_broken_python_keeps_valid_definitions() {
        let source = "def good():\n    return 1\n\ndef broken(:\n";
        let mut parser = SymbolParser::new();
        let symbols = parser.extract(Path::new("broken.py"), source).unwrap();
        assert!(symbols.functions.contains(&"good".to_string()));
    }
}
