use crate::utils::error::{Result, VerifyError};
use std::path::Path;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// 路徑不可為空，也不可含 NUL
pub fn validate_path(field_name: &str, path: &Path) -> Result<()> {
    let reason = if path.as_os_str().is_empty() {
        "Path cannot be empty"
    } else if path.to_string_lossy().contains('\0') {
        "Path contains null bytes"
    } else {
        return Ok(());
    };

    Err(VerifyError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: path.display().to_string(),
        reason: reason.to_string(),
    })
}

/// 暫存目錄每次執行都會被清空，不能與文件根目錄重疊
pub fn validate_scratch_outside(field_name: &str, scratch: &Path, docs_root: &Path) -> Result<()> {
    if docs_root.starts_with(scratch) || scratch == docs_root {
        return Err(VerifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: scratch.display().to_string(),
            reason: format!(
                "Scratch directory is cleared on every run and must not contain {}",
                docs_root.display()
            ),
        });
    }
    Ok(())
}

pub fn validate_min<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
) -> Result<()> {
    if value < min {
        return Err(VerifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(VerifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(VerifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// 副檔名不可包含 `.` 或路徑分隔符
pub fn validate_extension(field_name: &str, extension: &str) -> Result<()> {
    validate_non_empty_string(field_name, extension)?;

    if extension.contains(['.', '/', '\\']) {
        return Err(VerifyError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: extension.to_string(),
            reason: "Extension must not contain '.', '/' or '\\' (use \"md\", not \".md\")"
                .to_string(),
        });
    }
    Ok(())
}
