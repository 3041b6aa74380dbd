//! Display attributes per highlight category

use super::capture::CaptureName;
use crate::buffer::TextAttributes;
use ahash::AHashMap;

/// Maps highlight categories to display attributes
#[derive(Clone, Debug)]
pub struct Theme {
    pub name: String,
    /// Attributes for plain, uncaptured text
    pub text: TextAttributes,
    captures: AHashMap<CaptureName, TextAttributes>,
}

impl Theme {
    pub fn new(name: impl Into<String>, text: TextAttributes) -> Self {
        Self {
            name: name.into(),
            text,
            captures: AHashMap::new(),
        }
    }

    pub fn set(&mut self, capture: CaptureName, attributes: TextAttributes) {
        self.captures.insert(capture, attributes);
    }

    pub fn with(mut self, capture: CaptureName, attributes: TextAttributes) -> Self {
        self.set(capture, attributes);
        self
    }

    /// Attributes for `capture`; None and unthemed categories render as plain text
    pub fn attributes_for(&self, capture: Option<CaptureName>) -> TextAttributes {
        capture
            .and_then(|capture| self.captures.get(&capture).copied())
            .unwrap_or(self.text)
    }

    /// One Dark palette
    pub fn one_dark() -> Self {
        let color = TextAttributes::color;
        Self::new("One Dark", color(0xABB2BFFF))
            .with(CaptureName::Keyword, color(0xC678DDFF))
            .with(CaptureName::Function, color(0x61AFEFFF))
            .with(CaptureName::Type, color(0xE5C07BFF))
            .with(CaptureName::Constructor, color(0xE5C07BFF))
            .with(CaptureName::String, color(0x98C379FF))
            .with(CaptureName::Escape, color(0x56B6C2FF))
            .with(CaptureName::Number, color(0xD19A66FF))
            .with(
                CaptureName::Comment,
                TextAttributes {
                    foreground: 0x5C6370FF,
                    bold: false,
                    italic: true,
                },
            )
            .with(CaptureName::Constant, color(0xD19A66FF))
            .with(CaptureName::Operator, color(0x56B6C2FF))
            .with(CaptureName::Punctuation, color(0xABB2BFFF))
            .with(CaptureName::Variable, color(0xABB2BFFF))
            .with(CaptureName::Attribute, color(0xE06C75FF))
            .with(CaptureName::Namespace, color(0x61AFEFFF))
            .with(CaptureName::Property, color(0xE5C07BFF))
            .with(CaptureName::Parameter, color(0xABB2BFFF))
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::one_dark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uncaptured_text_is_plain() {
        let theme = Theme::one_dark();
        assert_eq!(theme.attributes_for(None), theme.text);
        assert_ne!(theme.attributes_for(Some(CaptureName::Keyword)), theme.text);
    }

    #[test]
    fn test_unthemed_capture_falls_back() {
        let theme = Theme::new("bare", TextAttributes::color(0xFFFFFFFF));
        assert_eq!(
            theme.attributes_for(Some(CaptureName::String)),
            TextAttributes::color(0xFFFFFFFF)
        );
    }
}
