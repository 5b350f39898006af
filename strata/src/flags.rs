//! Command-line flag binding.
//!
//! The engine does not parse command lines. A host hands over its parsed
//! flags through the [`FlagSet`] trait, which reports each flag's current
//! value and whether the user passed it explicitly. Only explicitly passed
//! flags outrank the environment, files and defaults; a flag left at its
//! built-in default is used only when no lower tier defines the key.
//!
//! [`ClapFlags`] adapts parsed `clap` arguments.

use std::sync::Arc;

use clap::parser::ValueSource;
use clap::ArgMatches;

use crate::value::Value;

/// The state of one flag at lookup time.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagState {
    /// The flag's current value (its default when not passed).
    pub value: Value,
    /// `true` if the user passed the flag explicitly.
    pub changed: bool,
}

/// A host-provided set of parsed flags.
#[cfg_attr(test, mockall::automock)]
pub trait FlagSet: Send + Sync {
    /// Returns the names of every flag in the set.
    fn names(&self) -> Vec<String>;

    /// Returns the state of the named flag, if it exists and has a value.
    fn lookup(&self, name: &str) -> Option<FlagState>;
}

/// A flag bound to a configuration key.
#[derive(Clone)]
pub(crate) struct FlagBinding {
    pub(crate) set: Arc<dyn FlagSet>,
    pub(crate) name: String,
}

impl FlagBinding {
    pub(crate) fn state(&self) -> Option<FlagState> {
        self.set.lookup(&self.name)
    }
}

impl std::fmt::Debug for FlagBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagBinding")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// [`FlagSet`] over parsed `clap` arguments.
///
/// Values are taken in their raw command-line form: a flag with one value
/// becomes a string, a flag with several values a list of strings. Boolean
/// switches (`ArgAction::SetTrue`) become the strings `"true"` / `"false"`,
/// which the typed accessors parse. A flag counts as changed when its value
/// came from the command line or from the argument's environment variable.
///
/// # Examples
///
/// ```
/// use clap::{Arg, Command};
/// use strata::{ClapFlags, FlagSet};
///
/// let matches = Command::new("demo")
///     .arg(Arg::new("flagname").long("flagname").default_value("1234"))
///     .try_get_matches_from(["demo"])
///     .unwrap();
/// let flags = ClapFlags::new(matches);
/// let state = flags.lookup("flagname").unwrap();
/// assert!(!state.changed);
/// assert_eq!(state.value.as_str(), Some("1234"));
/// ```
#[derive(Debug, Clone)]
pub struct ClapFlags {
    matches: ArgMatches,
}

impl ClapFlags {
    /// Wraps parsed arguments.
    #[must_use]
    pub const fn new(matches: ArgMatches) -> Self {
        Self { matches }
    }
}

impl From<ArgMatches> for ClapFlags {
    fn from(matches: ArgMatches) -> Self {
        Self::new(matches)
    }
}

impl FlagSet for ClapFlags {
    fn names(&self) -> Vec<String> {
        self.matches.ids().map(|id| id.as_str().to_string()).collect()
    }

    fn lookup(&self, name: &str) -> Option<FlagState> {
        let raw = self.matches.try_get_raw(name).ok().flatten()?;
        let mut values: Vec<Value> = raw
            .map(|v| Value::String(v.to_string_lossy().into_owned()))
            .collect();
        let value = match values.len() {
            0 => return None,
            1 => values.remove(0),
            _ => Value::List(values),
        };
        let changed = matches!(
            self.matches.value_source(name),
            Some(ValueSource::CommandLine | ValueSource::EnvVariable)
        );
        Some(FlagState { value, changed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, ArgAction, Command};

    fn command() -> Command {
        Command::new("demo")
            .arg(Arg::new("flagname").long("flagname").default_value("1234"))
            .arg(Arg::new("verbose").long("verbose").action(ArgAction::SetTrue))
            .arg(Arg::new("tags").long("tag").action(ArgAction::Append))
            .arg(Arg::new("unset").long("unset"))
    }

    #[test]
    fn test_default_is_not_changed() {
        let flags = ClapFlags::new(command().try_get_matches_from(["demo"]).unwrap());
        let state = flags.lookup("flagname").unwrap();
        assert_eq!(state.value, Value::from("1234"));
        assert!(!state.changed);
    }

    #[test]
    fn test_command_line_is_changed() {
        let flags = ClapFlags::new(
            command()
                .try_get_matches_from(["demo", "--flagname", "42"])
                .unwrap(),
        );
        let state = flags.lookup("flagname").unwrap();
        assert_eq!(state.value, Value::from("42"));
        assert!(state.changed);
    }

    #[test]
    fn test_switch_values() {
        let flags = ClapFlags::new(command().try_get_matches_from(["demo"]).unwrap());
        assert_eq!(flags.lookup("verbose").unwrap().value, Value::from("false"));

        let flags = ClapFlags::new(
            command()
                .try_get_matches_from(["demo", "--verbose"])
                .unwrap(),
        );
        let state = flags.lookup("verbose").unwrap();
        assert_eq!(state.value, Value::from("true"));
        assert!(state.changed);
    }

    #[test]
    fn test_multiple_values_become_list() {
        let flags = ClapFlags::new(
            command()
                .try_get_matches_from(["demo", "--tag", "a", "--tag", "b"])
                .unwrap(),
        );
        assert_eq!(
            flags.lookup("tags").unwrap().value,
            Value::from(vec!["a", "b"])
        );
    }

    #[test]
    fn test_missing_and_unknown() {
        let flags = ClapFlags::new(command().try_get_matches_from(["demo"]).unwrap());
        assert!(flags.lookup("unset").is_none());
        assert!(flags.lookup("no-such-flag").is_none());
    }

    #[test]
    fn test_names() {
        let flags = ClapFlags::new(command().try_get_matches_from(["demo"]).unwrap());
        let names = flags.names();
        assert!(names.contains(&"flagname".to_string()));
        assert!(names.contains(&"verbose".to_string()));
    }
}
