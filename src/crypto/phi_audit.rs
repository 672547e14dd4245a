// Static scan over every Rust source file: tracing calls must never carry
// patient identifiers, clinical text or credentials. Only opaque ids and
// column names may appear in log fields.

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    /// Fragments that MUST NOT appear inside a tracing macro call.
    const PHI_PATTERNS: &[&str] = &[
        // Patient identity and clinical text
        "first_name",
        "last_name",
        "therapy_reason",
        "observations",
        "emergency_contact",
        ".content",
        // Sensitive attribute values
        ".national_id",
        ".phone",
        ".email",
        ".address",
        "contact.",
        "plaintext",
        // Credentials
        "%secret",
        "?secret",
        "= secret",
        "%password",
        "?password",
        "= password",
        "%token",
        "?token",
        "= token",
    ];

    /// This file names the patterns on purpose.
    const ALLOWLIST: &[&str] = &["phi_audit.rs"];

    #[test]
    fn no_phi_in_tracing_calls() {
        let src_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
        assert!(src_dir.exists(), "Source directory not found: {}", src_dir.display());

        let mut violations = Vec::new();
        scan_directory(&src_dir, &mut violations);

        if !violations.is_empty() {
            let report = violations
                .iter()
                .map(|(file, line_num, line, pattern)| {
                    format!("  {}:{}: found '{}' in: {}", file, line_num, pattern, line.trim())
                })
                .collect::<Vec<_>>()
                .join("\n");
            panic!(
                "PHI AUDIT FAILED: {} violation(s) found in tracing calls:\n{}\n\n\
                 Fix: log opaque ids instead of patient data or credentials.",
                violations.len(),
                report
            );
        }
    }

    #[test]
    fn scanner_detects_known_violation() {
        let line = r#"tracing::info!(phone = %contact.phone, "stored patient");"#;
        assert_eq!(violations_in("demo.rs", line).len(), 2);
    }

    #[test]
    fn scanner_follows_multiline_calls() {
        let source = "tracing::warn!(\n    id = %id,\n    value = %input.first_name,\n    \"rejected\"\n);";
        let found = violations_in("demo.rs", source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, 1);
    }

    #[test]
    fn scanner_passes_clean_tracing() {
        let line = r#"tracing::info!(patient_id = %id, column = field.column(), "patient stored");"#;
        assert!(violations_in("demo.rs", line).is_empty());
    }

    fn scan_directory(dir: &Path, violations: &mut Vec<(String, usize, String, String)>) {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                scan_directory(&path, violations);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                let filename = path.file_name().unwrap_or_default().to_string_lossy();
                if ALLOWLIST.iter().any(|a| filename.contains(a)) {
                    continue;
                }
                let Ok(content) = fs::read_to_string(&path) else {
                    continue;
                };
                let relative = path
                    .strip_prefix(Path::new(env!("CARGO_MANIFEST_DIR")).join("src"))
                    .unwrap_or(&path)
                    .display()
                    .to_string();
                violations.extend(violations_in(&relative, &content));
            }
        }
    }

    /// Collect each tracing macro call (possibly multi-line) and match it
    /// against the patterns. Returns (file, 1-indexed line, call, pattern).
    fn violations_in(file: &str, content: &str) -> Vec<(String, usize, String, String)> {
        let mut found = Vec::new();
        let lines: Vec<&str> = content.lines().collect();
        let mut i = 0;
        while i < lines.len() {
            let trimmed = lines[i].trim();
            let is_tracing = ["info!", "warn!", "error!", "debug!", "trace!"]
                .iter()
                .any(|m| trimmed.starts_with(&format!("tracing::{m}")));
            if !is_tracing {
                i += 1;
                continue;
            }

            let mut call = String::from(trimmed);
            let mut depth = paren_delta(trimmed);
            let mut j = i + 1;
            while depth > 0 && j < lines.len() {
                let next = lines[j].trim();
                call.push(' ');
                call.push_str(next);
                depth += paren_delta(next);
                j += 1;
            }

            for pattern in PHI_PATTERNS {
                if call.contains(pattern) {
                    found.push((file.to_string(), i + 1, call.clone(), pattern.to_string()));
                }
            }
            i = j;
        }
        found
    }

    fn paren_delta(s: &str) -> i32 {
        s.chars().fold(0, |acc, ch| match ch {
            '(' => acc + 1,
            ')' => acc - 1,
            _ => acc,
        })
    }
}
