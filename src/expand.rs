use crate::env::Vars;

/// Expands a single word.
///
/// Rules, first match wins:
/// 1. `~` becomes `$HOME`
/// 2. `~/rest` becomes `$HOME/rest`
/// 3. `$NAME` becomes the value of `NAME`; an unbound name leaves the word
///    untouched, `$` included
/// 4. anything else is returned as is
///
/// There is no nested expansion: `$A$B` is a lookup of the name `A$B`.
pub fn expand<V: Vars + ?Sized>(word: &str, vars: &V) -> String {
    expand_tilde(word, vars)
        .or_else(|| expand_var(word, vars))
        .unwrap_or_else(|| word.to_owned())
}

fn expand_tilde<V: Vars + ?Sized>(word: &str, vars: &V) -> Option<String> {
    if word != "~" && !word.starts_with("~/") {
        return None;
    }

    let home = vars.var("HOME")?;
    Some(format!("{home}{}", &word[1..]))
}

fn expand_var<V: Vars + ?Sized>(word: &str, vars: &V) -> Option<String> {
    let name = word.strip_prefix('$').filter(|name| !name.is_empty())?;
    vars.var(name)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("HOME", "/home/u"),
            ("EDITOR", "vim"),
            ("EMPTY", ""),
        ])
    }

    #[test]
    fn bound_variable_yields_its_value() {
        assert_eq!(expand("$EDITOR", &vars()), "vim");
        assert_eq!(expand("$HOME", &vars()), "/home/u");
        assert_eq!(expand("$EMPTY", &vars()), "");
    }

    #[test]
    fn unbound_variable_is_left_literal() {
        // Some shells drop unresolved variables; here the word survives intact.
        assert_eq!(expand("$NOPE", &vars()), "$NOPE");
    }

    #[test]
    fn no_nested_expansion() {
        assert_eq!(expand("$EDITOR$HOME", &vars()), "$EDITOR$HOME");
        assert_eq!(expand("x$EDITOR", &vars()), "x$EDITOR");
    }

    #[test]
    fn lone_dollar_is_unchanged() {
        assert_eq!(expand("$", &vars()), "$");
    }

    #[test]
    fn tilde_forms() {
        assert_eq!(expand("~", &vars()), "/home/u");
        assert_eq!(expand("~/src/mysh", &vars()), "/home/u/src/mysh");
        assert_eq!(expand("~/", &vars()), "/home/u/");
    }

    #[test]
    fn other_tilde_forms_are_untouched() {
        assert_eq!(expand("~alice", &vars()), "~alice");
        assert_eq!(expand("a~", &vars()), "a~");
    }

    #[test]
    fn tilde_without_home_is_untouched() {
        let vars: HashMap<&str, &str> = HashMap::new();
        assert_eq!(expand("~", &vars), "~");
        assert_eq!(expand("~/x", &vars), "~/x");
    }
}
