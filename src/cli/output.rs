//! Output destinations for rendered isolines

use std::io::Write;
use std::path::Path;

use isocost::{Error, Result};

/// Overwrite behavior for existing files
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OverwriteBehavior {
    /// Prompt user for confirmation (default)
    #[default]
    Prompt,
    /// Force overwrite without prompting
    Force,
    /// Never overwrite, fail if file exists
    NeverOverwrite,
}

impl OverwriteBehavior {
    pub fn from_flags(force: bool, no_clobber: bool) -> Self {
        if force {
            OverwriteBehavior::Force
        } else if no_clobber {
            OverwriteBehavior::NeverOverwrite
        } else {
            OverwriteBehavior::Prompt
        }
    }
}

/// Output destination types
#[derive(Debug, Clone, PartialEq)]
pub enum OutputDestination {
    File(String),
    Stdout,
}

/// Resolve output destination from CLI arguments
///
/// An empty output derives `<input stem>.isocost.<extension>` in the
/// current directory; `-` means stdout.
pub fn resolve_output(input: &Path, output: &str, extension: &str) -> OutputDestination {
    if output == "-" {
        OutputDestination::Stdout
    } else if output.is_empty() {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("destinations");
        OutputDestination::File(format!("{stem}.isocost.{extension}"))
    } else {
        OutputDestination::File(output.to_string())
    }
}

/// Check if the destination file exists and handle overwrite behavior
pub fn check_overwrite_permission(file_path: &str, behavior: &OverwriteBehavior) -> Result<bool> {
    if !Path::new(file_path).exists() {
        return Ok(true);
    }

    match behavior {
        OverwriteBehavior::Force => {
            eprintln!("⚠️  Overwriting existing file: {file_path}");
            Ok(true)
        }
        OverwriteBehavior::NeverOverwrite => Err(Error::IoError(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("File already exists: {file_path} (use --force to overwrite)"),
        ))),
        OverwriteBehavior::Prompt => {
            eprintln!("⚠️  File already exists: {file_path}");
            eprint!("Overwrite? [y/N]: ");
            std::io::stderr().flush()?;

            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;

            match input.trim().to_lowercase().as_str() {
                "y" | "yes" => {
                    eprintln!("✅ Overwriting file");
                    Ok(true)
                }
                _ => {
                    eprintln!("❌ Rendering cancelled");
                    Err(Error::IoError(std::io::Error::new(
                        std::io::ErrorKind::Interrupted,
                        "Rendering cancelled by user",
                    )))
                }
            }
        }
    }
}

/// Write the rendered document to its destination
pub fn write_output(destination: &OutputDestination, contents: &str) -> Result<()> {
    match destination {
        OutputDestination::File(path) => std::fs::write(path, contents)?,
        OutputDestination::Stdout => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(contents.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_resolve_output_auto() {
        let output = resolve_output(Path::new("data/paris.json"), "", "svg");
        assert_eq!(output, OutputDestination::File("paris.isocost.svg".to_string()));
    }

    #[test]
    fn test_resolve_output_stdout() {
        assert_eq!(resolve_output(Path::new("paris.json"), "-", "json"), OutputDestination::Stdout);
    }

    #[test]
    fn test_resolve_output_custom_file() {
        let output = resolve_output(Path::new("paris.json"), "map.svg", "svg");
        assert_eq!(output, OutputDestination::File("map.svg".to_string()));
    }

    #[test]
    fn test_overwrite_from_flags() {
        assert_eq!(OverwriteBehavior::from_flags(true, false), OverwriteBehavior::Force);
        assert_eq!(OverwriteBehavior::from_flags(false, true), OverwriteBehavior::NeverOverwrite);
        assert_eq!(OverwriteBehavior::from_flags(false, false), OverwriteBehavior::Prompt);
    }

    #[test]
    fn test_overwrite_behavior_force() {
        let temp_file = NamedTempFile::new().unwrap();
        let file_path = temp_file.path().to_str().unwrap();
        std::fs::write(file_path, "existing content").unwrap();

        let result = check_overwrite_permission(file_path, &OverwriteBehavior::Force);
        assert!(result.unwrap(), "Force overwrite should return true");
    }

    #[test]
    fn test_overwrite_behavior_never() {
        let temp_file = NamedTempFile::new().unwrap();
        let file_path = temp_file.path().to_str().unwrap();
        std::fs::write(file_path, "existing content").unwrap();

        match check_overwrite_permission(file_path, &OverwriteBehavior::NeverOverwrite) {
            Err(Error::IoError(io_err)) => {
                assert_eq!(io_err.kind(), std::io::ErrorKind::AlreadyExists);
                assert!(io_err.to_string().contains("use --force to overwrite"));
            }
            other => panic!("Expected IoError with AlreadyExists kind, got {other:?}"),
        }
    }

    #[test]
    fn test_overwrite_behavior_new_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("nonexistent.svg");
        let file_path_str = file_path.to_str().unwrap();

        for behavior in [OverwriteBehavior::Force, OverwriteBehavior::NeverOverwrite, OverwriteBehavior::Prompt] {
            let result = check_overwrite_permission(file_path_str, &behavior);
            assert!(result.unwrap(), "All behaviors should return true for a new file");
        }
    }

    #[test]
    fn test_write_output_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("out.svg").to_str().unwrap().to_string();
        write_output(&OutputDestination::File(path.clone()), "<svg/>").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<svg/>");
    }
}
