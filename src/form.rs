//! Form state for the name entry, plus the text transforms applied to it.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const FILE_PREFIX: &str = "Diploma";

/// Upper-case the first letter of every word and lower-case the rest.
///
/// A word starts at any letter not preceded by a letter or digit; combining
/// marks continue the word they follow, so decomposed input (NFD) cases the
/// same as composed input. Characters whose case mapping expands to several
/// characters are left untouched, which keeps the transform idempotent.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_word = false;

    for c in input.chars() {
        if c.is_alphabetic() {
            if in_word {
                push_single_mapping(&mut out, c, c.to_lowercase());
            } else {
                push_single_mapping(&mut out, c, c.to_uppercase());
            }
        } else {
            out.push(c);
        }
        in_word = c.is_alphanumeric() || (in_word && is_combining_mark(c));
    }
    out
}

fn push_single_mapping(out: &mut String, original: char, mut mapped: impl Iterator<Item = char>) {
    match (mapped.next(), mapped.next()) {
        (Some(c), None) => out.push(c),
        _ => out.push(original),
    }
}

/// Strip diacritics, drop anything that is not an ASCII letter or
/// whitespace, and join the remaining words with underscores.
pub fn sanitize_name(name: &str) -> String {
    let letters: String = name
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect();

    let mut out = String::with_capacity(letters.len());
    let mut in_space = false;
    for c in letters.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// `Diploma_<SanitizedName>.pdf`, or `Diploma.pdf` when nothing survives sanitizing
pub fn diploma_filename(name: &str) -> String {
    let sanitized = sanitize_name(name.trim());
    if sanitized.trim_matches('_').is_empty() {
        format!("{}.pdf", FILE_PREFIX)
    } else {
        format!("{}_{}.pdf", FILE_PREFIX, sanitized)
    }
}

/// What the preview shows for the name overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub text: String,
    /// Placeholder text is drawn dimmed
    pub is_placeholder: bool,
}

/// Name entry and level selection for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    input: String,
    level: String,
    max_length: usize,
}

impl FormState {
    pub fn new(level: impl Into<String>, max_length: usize) -> Self {
        Self {
            input: String::new(),
            level: level.into(),
            max_length,
        }
    }

    /// Replace the entered text; it is truncated and title-cased
    pub fn set_input(&mut self, raw: &str) {
        let truncated: String = raw.chars().take(self.max_length).collect();
        self.input = title_case(&truncated);
    }

    pub fn set_level(&mut self, level: impl Into<String>) {
        self.level = level.into();
    }

    pub fn reset(&mut self) {
        self.input.clear();
    }

    /// The entered name without surrounding whitespace
    pub fn name(&self) -> &str {
        self.input.trim()
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    /// Characters typed, including surrounding whitespace
    pub fn char_count(&self) -> usize {
        self.input.chars().count()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn export_enabled(&self) -> bool {
        !self.name().is_empty()
    }

    pub fn overlay(&self, placeholder: &str) -> Overlay {
        if self.export_enabled() {
            Overlay { text: self.name().to_string(), is_placeholder: false }
        } else {
            Overlay { text: placeholder.to_string(), is_placeholder: true }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("josé ángel PÉREZ"), "José Ángel Pérez");
        assert_eq!(title_case("  maría-fernanda o'neil "), "  María-Fernanda O'Neil ");
        assert_eq!(title_case("1er lugar"), "1er Lugar");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_title_case_decomposed_input() {
        let decomposed: String = "ángel pérez".nfd().collect();
        let cased = title_case(&decomposed);
        assert_eq!(cased.nfc().collect::<String>(), "Ángel Pérez");
        assert_eq!(diploma_filename(&cased), "Diploma_Angel_Perez.pdf");

        let shouting: String = "MARÍA JOSÉ".nfd().collect();
        assert_eq!(title_case(&shouting).nfc().collect::<String>(), "María José");
    }

    #[test]
    fn test_title_case_is_idempotent() {
        for input in [
            "josé ángel",
            "ANA  lucía de la CRUZ",
            "straße ßa",
            "İstanbul ıi",
            "1er lugar: juan",
            "ǆemal",
        ] {
            let once = title_case(input);
            assert_eq!(title_case(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("José Ángel"), "Jose_Angel");
        assert_eq!(sanitize_name("Ana   María\tNúñez"), "Ana_Maria_Nunez");
        assert_eq!(sanitize_name("O'Neil-Smith 3º"), "ONeilSmith_");
    }

    #[test]
    fn test_diploma_filename() {
        assert_eq!(diploma_filename("José Ángel"), "Diploma_Jose_Angel.pdf");
        assert_eq!(diploma_filename("  Çağla Öztürk  "), "Diploma_Cagla_Ozturk.pdf");
        assert_eq!(diploma_filename("李小龙"), "Diploma.pdf");
    }

    #[test]
    fn test_filename_contains_only_letters_and_underscores() {
        for name in ["José Ángel", "Zoë  Saldaña!", "N°1 Renée", "a\u{301}b c"] {
            let file = diploma_filename(name);
            let stem = file.strip_suffix(".pdf").unwrap();
            assert!(
                stem.chars().all(|c| c.is_ascii_alphabetic() || c == '_'),
                "{:?} -> {:?}",
                name,
                file
            );
        }
    }

    #[test]
    fn test_form_input_and_count() {
        let mut form = FormState::new("primaria", 60);
        form.set_input(" josé ");
        assert_eq!(form.name(), "José");
        assert_eq!(form.char_count(), 6);
        assert!(form.export_enabled());
    }

    #[test]
    fn test_form_truncates_to_max_length() {
        let mut form = FormState::new("primaria", 5);
        form.set_input("ángeles");
        assert_eq!(form.name(), "Ángel");
        assert_eq!(form.char_count(), 5);
    }

    #[test]
    fn test_export_disabled_iff_trimmed_name_empty() {
        let mut form = FormState::new("primaria", 60);
        for (input, enabled) in [("", false), ("   ", false), ("\t", false), (" a ", true), ("Ana", true)] {
            form.set_input(input);
            assert_eq!(form.export_enabled(), enabled, "input {:?}", input);
        }
    }

    #[test]
    fn test_reset_restores_placeholder() {
        let mut form = FormState::new("kinder", 60);
        form.set_input("luis");
        assert_eq!(form.overlay("Nombre del Alumno").text, "Luis");

        form.reset();
        assert_eq!(form.char_count(), 0);
        assert!(!form.export_enabled());
        assert_eq!(
            form.overlay("Nombre del Alumno"),
            Overlay { text: "Nombre del Alumno".to_string(), is_placeholder: true }
        );
        assert_eq!(form.level(), "kinder");
    }
}
