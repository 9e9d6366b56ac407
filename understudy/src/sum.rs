// vim: tw=80
//! Running sums
//!
//! A running sum retires an expectation based on the accumulated arguments
//! of its calls rather than on how many calls arrived.

use crate::{
    error::ShapeMismatch,
    value::{Args, Kwargs, Value},
    Error,
};

/// Accumulates call arguments until they add up to a target.
#[derive(Clone, Debug, PartialEq)]
pub struct RunningSum {
    target: Args,
    total: Option<Args>,
}

impl RunningSum {
    pub fn new(target: Args) -> Self {
        RunningSum { target, total: None }
    }

    pub fn target(&self) -> &Args {
        &self.target
    }

    /// The accumulated arguments, or `None` before the first call.
    pub fn total(&self) -> Option<&Args> {
        self.total.as_ref()
    }

    /// Forget every recorded call.
    pub fn reset(&mut self) {
        self.total = None;
    }

    /// Add one call's arguments to the running total.
    ///
    /// The call must have the same arity and keyword names as the target.
    /// On error the total is left untouched.
    pub fn record(&mut self, args: &Args) -> Result<(), Error> {
        let expected = self.target.shape();
        let actual = args.shape();
        if expected != actual {
            return Err(ShapeMismatch { expected, actual }.into());
        }
        let total = match &self.total {
            None => args.clone(),
            Some(total) => add(total, args)?,
        };
        self.total = Some(total);
        Ok(())
    }

    /// True once the accumulated total equals the target.  A sum with no
    /// recorded calls is never satisfied, even for an empty target.
    pub fn is_satisfied(&self) -> bool {
        self.total.as_ref() == Some(&self.target)
    }
}

fn add_value(total: &Value, operand: &Value) -> Result<Value, Error> {
    total.checked_add(operand).ok_or_else(|| Error::Unsummable {
        total: total.clone(),
        operand: operand.clone(),
    })
}

/// Elementwise addition of two calls of the same shape.
fn add(total: &Args, operand: &Args) -> Result<Args, Error> {
    let mut sum = Args::new();
    for (t, o) in total.positional().iter().zip(operand.positional()) {
        sum.push(add_value(t, o)?);
    }
    let keywords: &Kwargs = total.keywords();
    for ((name, t), o) in keywords.iter().zip(operand.keywords().values()) {
        sum.insert(name.as_str(), add_value(t, o)?);
    }
    Ok(sum)
}

#[cfg(test)]
mod t {
    use super::*;

    fn check(expected: Args, calls: Vec<Args>, failed_calls: Vec<Args>) {
        let mut s = RunningSum::new(expected);
        for call in calls {
            assert!(!s.is_satisfied());
            s.record(&call).unwrap();
        }
        for call in failed_calls {
            let e = s.record(&call).unwrap_err();
            assert!(matches!(e, Error::ShapeMismatch(_)), "{e:?}");
        }
        assert!(s.is_satisfied());
    }

    #[test]
    fn empty_target_needs_a_call() {
        check(Args::new(), vec![Args::new()], vec![]);
    }

    #[test]
    fn numbers() {
        check(Args::new().arg(23).arg(42), vec![
            Args::new().arg(10).arg(2),
            Args::new().arg(10).arg(40),
            Args::new().arg(3).arg(0),
        ], vec![]);
    }

    #[test]
    fn strings() {
        check(Args::new().arg("testing").arg("this"), vec![
            Args::new().arg("tes").arg(""),
            Args::new().arg("ti").arg("thi"),
            Args::new().arg("ng").arg(""),
            Args::new().arg("").arg(""),
            Args::new().arg("").arg("s"),
        ], vec![]);
    }

    #[test]
    fn positional_and_keywords() {
        let call = |s: &str, n: i64, ks: &str, kn: i64| Args::new()
            .arg(s)
            .arg(n)
            .kwarg("kwargstring", ks)
            .kwarg("kwargnumber", kn);
        check(call("argstring", 10, "testvalue", 50), vec![
            call("", 5, "test", 40),
            call("a", 5, "", 1),
            call("r", 0, "", 1),
            call("gstrin", 0, "value", 1),
            call("g", 0, "", 7),
        ], vec![
            // Wrong number of positional arguments
            Args::new().arg("one").arg(2).arg(3)
                .kwarg("kwargstring", "whatever").kwarg("kwargnumber", 20),
            // Wrong keyword names
            Args::new().arg("one").arg(2)
                .kwarg("kwargstring!", "whatever").kwarg("kwargnumber", 20),
            // Extra keyword
            Args::new().arg("one").arg(2)
                .kwarg("kwargstring", "whatever").kwarg("kwargnumber", 20)
                .kwarg("newcrazyarg", 1),
        ]);
    }

    #[test]
    fn overshoot() {
        let mut s = RunningSum::new(Args::new().arg(10));
        s.record(&Args::new().arg(7)).unwrap();
        s.record(&Args::new().arg(7)).unwrap();
        assert!(!s.is_satisfied());
        assert_eq!(Some(&Args::new().arg(14)), s.total());
    }

    #[test]
    fn shape_mismatch_payload() {
        let mut s = RunningSum::new(Args::new().arg(1).kwarg("a", 1));
        let e = s.record(&Args::new().arg(1)).unwrap_err();
        match e {
            Error::ShapeMismatch(m) => {
                assert_eq!(1, m.expected.arity);
                assert!(m.expected.keywords.contains("a"));
                assert!(m.actual.keywords.is_empty());
            },
            e => panic!("Unexpected error {e:?}")
        }
        assert_eq!(None, s.total());
    }

    #[test]
    fn unsummable() {
        let mut s = RunningSum::new(Args::new().arg(true));
        s.record(&Args::new().arg(false)).unwrap();
        let e = s.record(&Args::new().arg(true)).unwrap_err();
        assert!(matches!(e, Error::Unsummable{..}), "{e:?}");
    }

    #[test]
    fn reset() {
        let mut s = RunningSum::new(Args::new().arg(2));
        s.record(&Args::new().arg(2)).unwrap();
        assert!(s.is_satisfied());
        s.reset();
        assert!(!s.is_satisfied());
        assert_eq!(None, s.total());
    }
}
