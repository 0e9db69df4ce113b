// Query tokenizer for the keyword pass

use std::collections::BTreeSet;

/// Words that carry no signal for file matching: English and German function
/// words plus generic programming terms users put in every question
const STOP_WORDS: &[&str] = &[
    // English
    "a", "an", "the", "and", "or", "not", "of", "to", "in", "on", "at", "by", "for", "from",
    "with", "into", "as", "is", "are", "was", "were", "be", "been", "it", "its", "this", "that",
    "these", "those", "i", "me", "my", "we", "our", "you", "your", "how", "what", "where",
    "which", "who", "why", "when", "do", "does", "did", "can", "could", "should", "would",
    "will", "please", "there", "here", "all", "any", "some",
    // German
    "der", "die", "das", "den", "dem", "des", "ein", "eine", "einen", "einem", "einer", "und",
    "oder", "nicht", "ist", "sind", "war", "wird", "werden", "wie", "wo", "wer", "warum",
    "wann", "ich", "mir", "mich", "du", "wir", "es", "im", "zu", "zum", "zur", "mit", "von",
    "vom", "auf", "aus", "bei", "für", "über", "bitte", "kann", "können", "soll", "muss",
    "diese", "dieser", "dieses", "alle",
    // Generic terms
    "file", "files", "class", "classes", "function", "functions", "method", "methods", "code",
    "datei", "dateien", "klasse", "klassen", "funktion", "funktionen", "methode", "methoden",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Lowercase `text`, blank out everything except letters, digits, `_ . / \ -`
/// and whitespace, split on whitespace and path separators, and drop stop words.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric()
                || c.is_whitespace()
                || matches!(c, '_' | '.' | '/' | '\\' | '-')
            {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split(|c: char| c.is_whitespace() || c == '/' || c == '\\')
        .map(|token| token.trim_matches(|c| c == '.' || c == '-'))
        .filter(|token| !token.is_empty() && !is_stop_word(token))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<String> {
        tokenize(text).into_iter().collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(tokens("How do I add_vectors?"), vec!["add_vectors"]);
        assert_eq!(
            tokens("Refactor the Matrix class, please!"),
            vec!["matrix", "refactor"]
        );
    }

    #[test]
    fn test_paths_are_split() {
        assert_eq!(
            tokens("look at utils/math_ops.py"),
            vec!["look", "math_ops.py", "utils"]
        );
        assert_eq!(tokens(r"src\gui\chatbot.py"), vec!["chatbot.py", "gui", "src"]);
    }

    #[test]
    fn test_sentence_punctuation_is_trimmed() {
        assert_eq!(tokens("fix the parser."), vec!["fix", "parser"]);
        assert_eq!(tokens("-- cache --"), vec!["cache"]);
    }

    #[test]
    fn test_german_stop_words() {
        assert_eq!(
            tokens("Wo ist die Funktion zum Laden der Datei?"),
            vec!["laden"]
        );
    }

    #[test]
    fn test_umlauts_stay_in_tokens() {
        assert_eq!(
            tokens("Wo wird die Größe berechnet?"),
            vec!["berechnet", "größe"]
        );
        assert_eq!(tokens("Änderung für übersicht.py"), vec!["änderung", "übersicht.py"]);
    }

    #[test]
    fn test_stop_word_list_has_no_duplicates() {
        let unique: BTreeSet<&str> = STOP_WORDS.iter().copied().collect();
        assert_eq!(unique.len(), STOP_WORDS.len());
    }

    #[test]
    fn test_only_stop_words() {
        assert!(tokenize("what is the file for").is_empty());
        assert!(tokenize("").is_empty());
        assert!(tokenize("?!").is_empty());
    }
}
