// vim: tw=80
//! Errors and failure reports

use std::{
    collections::BTreeMap,
    error::Error as StdError,
    fmt,
    rc::Rc,
};

use thiserror::Error;

use crate::{
    expectation::{ExpectationId, ExpectationInfo},
    mock::{Call, MockId},
    value::{Shape, Value},
};

#[derive(Debug, Error)]
pub enum Error {
    /// Required expectations were never satisfied.
    #[error(transparent)]
    Unmet(#[from] UnmetExpectations),
    /// No active expectation matched a call.
    #[error(transparent)]
    UnexpectedCall(#[from] UnexpectedCall),
    /// A running-sum call had the wrong arity or keyword names.
    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatch),
    #[error("cannot add {operand} to running total {total}")]
    Unsummable { total: Value, operand: Value },
    #[error("Don't expect a call to both raise and return ({0})")]
    ReturnConflict(ExpectationId),
    #[error("Sequences must live in only one context")]
    CrossContext,
    #[error("{0} has already been retired")]
    Retired(ExpectationId),
    #[error("{class} has no mocked method named {name}")]
    NoSuchMethod { class: String, name: String },
    #[error("cannot convert {found} to {expected}")]
    Conversion { expected: &'static str, found: Value },
    /// An error configured with
    /// [`Expectation::raises`](crate::Expectation::raises).
    #[error(transparent)]
    Raised(#[from] Raised),
}

impl Error {
    /// The error an expectation was told to raise, if that is what this is.
    pub fn raised(&self) -> Option<&Raised> {
        match self {
            Error::Raised(r) => Some(r),
            _ => None
        }
    }
}

/// A user-supplied error, raised by a satisfied expectation.
#[derive(Clone, Debug)]
pub struct Raised(Rc<dyn StdError>);

impl Raised {
    pub fn new<E: StdError + 'static>(e: E) -> Self {
        Raised(Rc::new(e))
    }

    /// Recover the original error.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Display for Raised {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for Raised {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// The running-sum call shape disagreed with the target's.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("running sum expected arguments shaped {expected}, got {actual}")]
pub struct ShapeMismatch {
    pub expected: Shape,
    pub actual: Shape,
}

/// Write `infos` grouped by owning mock, one header per mock.
fn write_grouped(f: &mut fmt::Formatter, infos: &[ExpectationInfo],
    explain: Option<&Call>) -> fmt::Result
{
    let mut groups: BTreeMap<(MockId, &str), Vec<&ExpectationInfo>> =
        BTreeMap::new();
    for info in infos {
        groups.entry((info.method.mock(), info.method.class()))
            .or_default()
            .push(info);
    }
    for ((mock, class), mut group) in groups {
        group.sort_by_cached_key(|info| info.to_string());
        writeln!(f, "Mock:         {class} #{mock}")?;
        for info in group {
            writeln!(f, "Expectation:  {info}")?;
            let Some(call) = explain else { continue };
            if info.method != call.method {
                continue;
            }
            for reason in info.pattern.explain(&call.args) {
                for line in reason.lines() {
                    writeln!(f, "    {line}")?;
                }
            }
        }
    }
    Ok(())
}

/// Required expectations left over at the end of a test.
#[derive(Clone, Debug)]
pub struct UnmetExpectations {
    pub required: Vec<ExpectationInfo>,
}

impl fmt::Display for UnmetExpectations {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Unmet expectations:")?;
        write_grouped(f, &self.required, None)
    }
}

impl StdError for UnmetExpectations {}

/// A call that no active expectation accepted.
#[derive(Clone, Debug)]
pub struct UnexpectedCall {
    pub call: Call,
    /// The active expectations at the time of the call.
    pub active: Vec<ExpectationInfo>,
}

impl fmt::Display for UnexpectedCall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Could not find a suitable expectation:")?;
        writeln!(f, "Call:         {}", self.call)?;
        if self.active.is_empty() {
            writeln!(f, "Active Expectation Set: (empty)")
        } else {
            writeln!(f, "Active Expectation Set:")?;
            write_grouped(f, &self.active, Some(&self.call))
        }
    }
}

impl StdError for UnexpectedCall {}

#[cfg(test)]
mod t {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("disk on fire")]
    struct OnFire;

    #[test]
    fn raised_downcast() {
        let e = Error::from(Raised::new(OnFire));
        assert_eq!("disk on fire", e.to_string());
        assert!(e.raised().unwrap().downcast_ref::<OnFire>().is_some());
        assert!(e.raised().unwrap().downcast_ref::<std::fmt::Error>()
            .is_none());
    }

    #[test]
    fn raised_is_none_otherwise() {
        assert!(Error::CrossContext.raised().is_none());
    }

    #[test]
    fn shape_mismatch_display() {
        let e = Error::from(ShapeMismatch {
            expected: Shape {
                arity: 2,
                keywords: ["a".to_owned()].into_iter().collect()
            },
            actual: Shape { arity: 1, keywords: Default::default() },
        });
        assert_eq!("running sum expected arguments shaped \
            (2 positional; keywords: a), got (1 positional)", e.to_string());
    }

    #[test]
    fn conversion_display() {
        let e = Error::Conversion { expected: "u8", found: Value::from(-1) };
        assert_eq!("cannot convert -1 to u8", e.to_string());
    }
}
