//! Error message formatting with actionable suggestions.

use std::error::Error;

use sprig_core::error::SprigError;

use super::colors::ColorSupport;

pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self {
            colors: ColorSupport::detect(),
        }
    }

    /// Error message, then the suggestion and cause chain when present
    pub fn format_error(&self, error: &SprigError) -> String {
        let mut output = String::new();

        output.push_str(&self.colors.red("error"));
        output.push_str(": ");
        output.push_str(&error.to_string());
        output.push('\n');

        if let Some(suggestion) = error.suggestion() {
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        let mut source = error.source();
        while let Some(err) = source {
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            output.push('\n');
            source = err.source();
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_with_suggestion_and_cause() {
        let formatter = ErrorFormatter {
            colors: ColorSupport::disabled(),
        };

        let not_installed = SprigError::PackageNotInstalled {
            package: "radio".to_string(),
        };
        let text = formatter.format_error(&not_installed);
        assert!(text.starts_with("error: "));
        assert!(text.contains("radio"));
        assert!(text.contains("help: Run 'sprig install'"));

        let io = SprigError::io(
            "Failed to read sprig.json".to_string(),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let text = formatter.format_error(&io);
        assert!(text.contains("caused by: denied"));
    }
}
