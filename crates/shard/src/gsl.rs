//! Builders for the GSL task text the gateway generates itself.
//!
//! GSL is opaque to the gateway beyond being a brace-delimited string. The
//! only rule enforced here is that client-supplied attribute values (user
//! agents, addresses, language tags) can never open or close a block.

use crate::session::ChatSession;
use crate::{Locale, UserId};

/// Wraps a client query so the engine answers in JSON for `locale`.
pub fn query_task(locale: &Locale, query: &str) -> String {
    format!("{{task{{format JSON}}{{locale {locale}}}{{repo ~{query}}}}}")
}

/// Registers a new user instance described by the session's client attributes.
pub fn register_user_task(session: &ChatSession) -> String {
    let mut task = String::from("{task{class User{!inst{_auth");
    task.push_str(&format!("{{agent {}}}", attribute(&session.user_agent)));
    if let Some(ip) = &session.user_ip {
        task.push_str(&format!("{{ip {}}}", attribute(ip)));
    }
    if !session.langs.is_empty() {
        task.push_str("{langs");
        for lang in &session.langs {
            task.push_str(&format!("{{{}}}", attribute(lang)));
        }
        task.push('}');
    }
    task.push_str("}}}}");
    task
}

/// Records a decoded statement against the user who made it.
///
/// `statement` is graph text from the linguistic service and is embedded
/// verbatim.
pub fn statement_task(user_id: &UserId, statement: &str) -> String {
    format!(
        "{{task{{class User{{inst {}{{stm {statement}}}}}}}}}",
        attribute(user_id.as_str())
    )
}

/// Neutralises block delimiters in a client-supplied value.
fn attribute(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '{' => '(',
            '}' => ')',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_wrapped_with_format_and_locale() {
        let task = query_task(&Locale::from_tag("ru").unwrap(), "{class Dolphin}");
        assert_eq!(task, "{task{format JSON}{locale ru}{repo ~{class Dolphin}}}");
    }

    #[test]
    fn language_header_cannot_add_blocks_to_a_query() {
        let session = ChatSession::new(
            "Mozilla/5.0",
            None,
            crate::parse_accept_language("en}{repo ~{!class Evil}}{x"),
        );

        let task = query_task(&session.locale(), "{class Dolphin}");

        assert_eq!(task, "{task{format JSON}{locale en}{repo ~{class Dolphin}}}");
    }

    #[test]
    fn registration_embeds_client_attributes() {
        let session = ChatSession::new(
            "Mozilla/5.0",
            Some("10.0.0.7".into()),
            vec!["en-US".into(), "ru".into()],
        );
        assert_eq!(
            register_user_task(&session),
            "{task{class User{!inst{_auth{agent Mozilla/5.0}{ip 10.0.0.7}{langs{en-US}{ru}}}}}}"
        );
    }

    #[test]
    fn registration_neutralises_braces_in_user_agent() {
        let session = ChatSession::new("evil}{!inst}", None, vec![]);
        assert_eq!(
            register_user_task(&session),
            "{task{class User{!inst{_auth{agent evil)(!inst)}}}}}"
        );
    }

    #[test]
    fn statement_is_attached_to_user() {
        let task = statement_task(&UserId::new("U123").unwrap(), "{fact Sky{color Blue}}");
        assert_eq!(task, "{task{class User{inst U123{stm {fact Sky{color Blue}}}}}}");
    }
}
