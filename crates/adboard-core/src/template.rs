//! Placeholder substitution applied to advertisement text at creation.

/// Token replaced with the author's username.
pub const USER_PLACEHOLDER: &str = "{{ user }}";

/// Replace every literal [`USER_PLACEHOLDER`] in `text` with `username`.
///
/// Matching is exact and case-sensitive; `{{user}}` or `{{ USER }}` are left
/// untouched.
pub fn render_user_placeholder(text: &str, username: &str) -> String {
  text.replace(USER_PLACEHOLDER, username)
}
