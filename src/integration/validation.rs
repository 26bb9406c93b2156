//! Playlist validation utilities

/// Result of validating a generated playlist
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    /// `(directive, url)` pairs in document order
    pub entries: Vec<(String, String)>,
}

/// Validate the structure of an extended M3U document
pub fn validate_m3u(content: &str) -> ValidationResult {
    let mut errors = Vec::new();
    let mut entries = Vec::new();
    let lines: Vec<&str> = content.lines().collect();

    if lines.first() != Some(&"#EXTM3U") {
        errors.push("Missing #EXTM3U header".to_string());
    }
    if !content.contains("\n# Expires: ") {
        errors.push("Missing expiry comment".to_string());
    }

    for (i, line) in lines.iter().enumerate() {
        if !line.starts_with("#EXTINF:") {
            if !line.is_empty() && !line.starts_with('#') {
                let follows_directive = i > 0 && lines[i - 1].starts_with("#EXTINF:");
                if !follows_directive {
                    errors.push(format!("URL without directive on line {}", i + 1));
                }
            }
            continue;
        }

        if !line.contains("group-title=\"") {
            errors.push(format!("Directive without group-title on line {}", i + 1));
        }
        if !line.contains(',') {
            errors.push(format!("Directive without display name on line {}", i + 1));
        }

        // Instruction directives are followed by comments instead of a URL
        match lines.get(i + 1) {
            Some(next) if !next.starts_with('#') && !next.is_empty() => {
                entries.push((line.to_string(), next.to_string()));
            }
            Some(next) if next.starts_with("# File ID: ") => {}
            _ => errors.push(format!("Directive without URL on line {}", i + 1)),
        }
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
        entries,
    }
}

/// Value of a comment header line such as `# Expires: `
pub fn header_value<'a>(content: &'a str, prefix: &str) -> Option<&'a str> {
    content
        .lines()
        .take_while(|l| l.starts_with('#'))
        .find_map(|l| l.strip_prefix(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_missing_header() {
        let result = validate_m3u("#EXTINF:-1 group-title=\"x\",A\nhttp://a\n");
        assert!(!result.is_valid);
    }

    #[test]
    fn test_rejects_dangling_url() {
        let result = validate_m3u("#EXTM3U\n# Expires: 2024-01-01\nhttp://a\n");
        assert!(result.errors.iter().any(|e| e.contains("URL without directive")));
    }

    #[test]
    fn test_header_value() {
        let doc = "#EXTM3U\n# Expires: 2024-10-01\n#EXTINF:-1 group-title=\"x\",A\nhttp://a\n";
        assert_eq!(header_value(doc, "# Expires: "), Some("2024-10-01"));
        assert_eq!(header_value(doc, "# Missing: "), None);
    }
}
