use thiserror::Error;

/// Rejections for malformed or incomplete batch requests. The wording is
/// what the extension displays to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No issues selected")]
    NoIssues,
    #[error("Owner email is required")]
    MissingOwner,
    #[error("Member emails are required")]
    NoMembers,
}
