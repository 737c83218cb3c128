//! Assertions over pending results

use std::fmt::Debug;

use crate::executor::{Chained, PendingResult};
use crate::models::{Failure, FailureKind};

/// Fail unless `result` fails with one of `kinds`.
///
/// The returned result succeeds with the captured failure, so a test can
/// inspect it further, and fails with an assertion failure otherwise.
pub fn assert_failure<T>(result: &PendingResult<T>, kinds: &[FailureKind]) -> PendingResult<Failure>
where
    T: Clone + Debug + 'static,
{
    let kinds = kinds.to_vec();
    result.then(move |outcome| {
        Chained::Ready(match outcome {
            Ok(value) => Err(Failure::assertion(format!(
                "did not catch an error, instead got {value:?}"
            ))),
            Err(failure) if failure.check(&kinds) => Ok(failure),
            Err(failure) => Err(Failure::assertion(format!(
                "\nExpected: {kinds:?}\nGot:\n{failure}"
            ))
            .with_cause(failure)),
        })
    })
}
