//! Command template rendering
//!
//! A template carries five positional slots which are filled, in order,
//! with the executable, interface, port, document root and log file.
//! `{}` takes the next slot, `{N}` takes slot `N`, and `{{` / `}}` produce
//! literal braces (needed for shell constructs such as `${var}`).

use crate::error::ConfigError;

/// Number of positional slots a command template may reference
pub const SLOT_COUNT: usize = 5;

/// Render `template` with the given slot values
pub fn render(template: &str, slots: &[&str; SLOT_COUNT]) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidTemplate {
        template: template.to_string(),
        reason,
    };

    let mut rendered = String::with_capacity(template.len() + 64);
    let mut next_slot = 0;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                rendered.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                rendered.push('}');
            }
            '{' => {
                let mut index = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(d) if d.is_ascii_digit() => index.push(d),
                        Some(other) => {
                            return Err(invalid(format!("unexpected '{}' in placeholder", other)))
                        }
                        None => return Err(invalid("unterminated placeholder".to_string())),
                    }
                }

                let slot = if index.is_empty() {
                    next_slot += 1;
                    next_slot - 1
                } else {
                    index
                        .parse::<usize>()
                        .map_err(|_| invalid(format!("bad slot index {}", index)))?
                };

                let value = slots.get(slot).ok_or_else(|| {
                    invalid(format!(
                        "slot {} out of range (only {} slots available)",
                        slot, SLOT_COUNT
                    ))
                })?;
                rendered.push_str(value);
            }
            '}' => return Err(invalid("unmatched '}'".to_string())),
            other => rendered.push(other),
        }
    }

    Ok(rendered)
}
