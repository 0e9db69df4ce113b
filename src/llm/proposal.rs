// Edit proposals returned by the model for `ask`

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

/// System prompt for `ask`; the answer must be machine readable
pub const SYSTEM_PROMPT: &str = "You are a senior software engineer working on the project \
described below. Implement the user request by editing the relevant files. \
Answer ONLY with a JSON array. Each element must be an object with the keys \
\"file\" (path relative to the project root) and \"new_content\" (the complete new \
content of that file). Do not add explanations outside the JSON.";

/// Full replacement content for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProposal {
    pub file: String,
    pub new_content: String,
}

/// Parse the model answer into proposals. The array may be wrapped in a
/// code fence or surrounded by prose.
pub fn parse_proposals(raw: &str) -> Result<Vec<FileProposal>> {
    let start = raw
        .find('[')
        .ok_or_else(|| anyhow!("Model answer contains no JSON array"))?;
    let end = raw
        .rfind(']')
        .filter(|&end| end > start)
        .ok_or_else(|| anyhow!("Model answer contains no complete JSON array"))?;

    let proposals: Vec<FileProposal> = serde_json::from_str(&raw[start..=end])
        .context("Failed to parse edit proposals from model answer")?;

    for proposal in &proposals {
        validate_file_name(&proposal.file)?;
    }
    Ok(proposals)
}

fn validate_file_name(file: &str) -> Result<()> {
    if file.trim().is_empty() {
        bail!("Proposal has an empty file name");
    }
    let path = Path::new(file);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        bail!("Proposal file {:?} is not a path inside the project", file);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_array() {
        let raw = r#"[{"file": "utils/math_ops.py", "new_content": "def add(a, b):\n    return a + b\n"}]"#;
        let proposals = parse_proposals(raw).unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].file, "utils/math_ops.py");
        assert!(proposals[0].new_content.starts_with("def add"));
    }

    #[test]
    fn test_parse_fenced_answer() {
        let raw = "Here you go:\n```json\n[\n  {\"file\": \"a.py\", \"new_content\": \"x = [1, 2]\"},\n  {\"file\": \"b.py\", \"new_content\": \"\"}\n]\n```\n";
        let proposals = parse_proposals(raw).unwrap();
        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0].new_content, "x = [1, 2]");
        assert_eq!(proposals[1].file, "b.py");
    }

    #[test]
    fn test_empty_array() {
        assert!(parse_proposals("[]").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_answers() {
        assert!(parse_proposals("I cannot help with that.").is_err());
        assert!(parse_proposals("] oops [").is_err());
        assert!(parse_proposals(r#"[{"file": "a.py"}]"#).is_err());
        assert!(parse_proposals(r#"[{"path": "a.py", "new_content": ""}]"#).is_err());
    }

    #[test]
    fn test_rejects_bad_file_names() {
        assert!(parse_proposals(r#"[{"file": "  ", "new_content": ""}]"#).is_err());
        assert!(parse_proposals(r#"[{"file": "../etc/passwd", "new_content": ""}]"#).is_err());
        assert!(parse_proposals(r#"[{"file": "/tmp/x.py", "new_content": ""}]"#).is_err());
        assert!(parse_proposals(r#"[{"file": "./src/ok.py", "new_content": ""}]"#).is_ok());
    }
}
