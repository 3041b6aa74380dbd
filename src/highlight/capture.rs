//! Highlight categories shared across languages

/// Category a highlight query assigns to a range of text
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaptureName {
    Keyword,
    Function,
    Type,
    Constructor,
    String,
    Escape,
    Number,
    Comment,
    Constant,
    Operator,
    Punctuation,
    Variable,
    Attribute,
    Namespace,
    Property,
    Parameter,
}

impl CaptureName {
    /// Map a tree-sitter capture name to a category
    ///
    /// Unlisted dotted names fall back to their leading segment, so
    /// `keyword.control.rust` resolves like `keyword`.
    pub fn from_capture(name: &str) -> Option<Self> {
        Self::exact(name).or_else(|| {
            let (head, _) = name.split_once('.')?;
            Self::exact(head)
        })
    }

    fn exact(name: &str) -> Option<Self> {
        let capture = match name {
            "keyword"
            | "keyword.control"
            | "keyword.control.conditional"
            | "keyword.control.repeat"
            | "keyword.control.import"
            | "keyword.control.return"
            | "keyword.function"
            | "keyword.operator"
            | "keyword.storage"
            | "keyword.storage.modifier"
            | "include"
            | "repeat"
            | "conditional" => Self::Keyword,

            "function" | "function.builtin" | "function.call" | "function.macro"
            | "function.method" | "method" | "method.call" => Self::Function,

            "type" | "type.builtin" | "type.primitive" | "type.qualifier" | "class"
            | "storage.type" => Self::Type,

            "constructor" => Self::Constructor,

            "string" | "string.quoted" | "string.regex" | "string.special" | "char"
            | "character" => Self::String,

            "escape" | "string.escape" => Self::Escape,

            "number" | "constant.numeric" | "float" => Self::Number,

            "comment" | "comment.line" | "comment.block" | "comment.documentation" => {
                Self::Comment
            }

            "constant" | "constant.builtin" | "constant.language" | "boolean" => Self::Constant,

            "operator" => Self::Operator,

            "punctuation"
            | "punctuation.bracket"
            | "punctuation.delimiter"
            | "punctuation.special" => Self::Punctuation,

            "variable" | "variable.builtin" | "variable.other" | "variable.other.member" => {
                Self::Variable
            }

            "attribute" | "decorator" | "annotation" => Self::Attribute,

            "namespace" | "module" => Self::Namespace,

            "property" | "field" => Self::Property,

            "parameter" | "variable.parameter" | "label" => Self::Parameter,

            _ => return None,
        };
        Some(capture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_names() {
        assert_eq!(CaptureName::from_capture("keyword"), Some(CaptureName::Keyword));
        assert_eq!(CaptureName::from_capture("function.macro"), Some(CaptureName::Function));
        assert_eq!(CaptureName::from_capture("variable.parameter"), Some(CaptureName::Parameter));
        assert_eq!(CaptureName::from_capture("comment.documentation"), Some(CaptureName::Comment));
    }

    #[test]
    fn test_dotted_fallback() {
        assert_eq!(CaptureName::from_capture("keyword.control.rust"), Some(CaptureName::Keyword));
        assert_eq!(CaptureName::from_capture("string.escape.unicode"), Some(CaptureName::String));
        assert_eq!(CaptureName::from_capture("injection.content"), None);
        assert_eq!(CaptureName::from_capture("spell"), None);
    }
}
