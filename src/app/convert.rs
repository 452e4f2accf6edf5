//! Conversions from CLI-facing types to internal ones.

use crate::{
    cli::Format,
    output::{OutputFormat, OutputOptions}
};

/// Converts a CLI format to the internal output format.
///
/// # Example
///
/// ```
/// use ocean_data_query::{app::convert_format, cli::Format, output::OutputFormat};
///
/// assert_eq!(convert_format(Format::Json), OutputFormat::Json);
/// ```
pub fn convert_format(format: Format) -> OutputFormat {
    match format {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
        Format::Yaml => OutputFormat::Yaml
    }
}

/// Builds output options from global CLI flags.
///
/// Any `-v` also switches the text formatter to show every record instead
/// of a short preview.
pub fn create_output_options(format: Format, no_color: bool, verbosity: u8) -> OutputOptions {
    OutputOptions {
        format:  convert_format(format),
        colored: !no_color,
        verbose: verbosity > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_format_all() {
        assert_eq!(convert_format(Format::Text), OutputFormat::Text);
        assert_eq!(convert_format(Format::Json), OutputFormat::Json);
        assert_eq!(convert_format(Format::Yaml), OutputFormat::Yaml);
    }

    #[test]
    fn test_create_output_options() {
        let opts = create_output_options(Format::Yaml, true, 0);
        assert_eq!(opts.format, OutputFormat::Yaml);
        assert!(!opts.colored);
        assert!(!opts.verbose);

        let opts = create_output_options(Format::Text, false, 2);
        assert!(opts.colored);
        assert!(opts.verbose);
    }
}
