//! Integration tests for paging through search results.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

use restpose::error::{RestPoseError, Result};
use restpose::query::{Query, TargetExt, realiser};

use common::NumTarget;

fn num_of(result: &restpose::query::SearchResult) -> Option<u64> {
    result
        .field("num")
        .and_then(|values| values.first())
        .and_then(Value::as_u64)
}

#[test]
fn test_descending_order_over_every_document() -> Result<()> {
    let target = NumTarget::new(193);
    let q = target.all().order_by("num", Some(false));

    assert_eq!(num_of(&q.get(0)?), Some(192));
    assert_eq!(num_of(&q.get(1)?), Some(191));
    assert_eq!(num_of(&q.get(192)?), Some(0));
    assert!(q.get(193).unwrap_err().is_out_of_range());

    let ascending = target.all().order_by("num", None);
    assert_eq!(num_of(&ascending.get(0)?), Some(0));
    assert_eq!(num_of(&ascending.get(192)?), Some(192));

    Ok(())
}

#[test]
fn test_first_page_request() -> Result<()> {
    let target = NumTarget::new(193);
    let q = target.all().slice(0..10)?;
    assert_eq!(q.get(0)?.rank(), 0);

    assert_eq!(
        target.last_request(),
        json!({"query": {"matchall": true}, "size": 10, "check_at_least": 11})
    );
    Ok(())
}

#[test]
fn test_len_is_idempotent() -> Result<()> {
    let target = NumTarget::new(193);
    let q = target.all().searchable();

    assert_eq!(q.len()?, 193);
    let requests = target.request_count();
    assert_eq!(target.last_request()["check_at_least"], json!(-1));

    assert_eq!(q.len()?, 193);
    assert_eq!(target.request_count(), requests);
    assert!(q.estimate_is_exact()?);

    Ok(())
}

#[test]
fn test_len_of_slices() -> Result<()> {
    let target = NumTarget::new(193);
    let q = target.all();

    assert_eq!(q.slice(5..15)?.len()?, 10);
    assert_eq!(q.slice(190..)?.len()?, 3);
    assert_eq!(q.slice(185..200)?.len()?, 8);
    assert_eq!(q.slice(200..)?.len()?, 0);
    assert!(q.slice(200..)?.is_empty()?);
    assert!(target.none().searchable().is_empty()?);

    Ok(())
}

#[test]
fn test_has_more() -> Result<()> {
    let target = NumTarget::new(193);
    let q = target.all().searchable();

    assert!(!q.has_more()?);
    assert!(q.slice(0..10)?.has_more()?);
    assert!(q.slice(0..192)?.has_more()?);
    assert!(!q.slice(0..193)?.has_more()?);
    assert!(!q.slice(185..195)?.has_more()?);

    Ok(())
}

#[test]
fn test_match_statistics() -> Result<()> {
    let target = NumTarget::new(193);
    let window = target.all().slice(0..10)?;

    assert_eq!(window.total_docs()?, 193);
    assert_eq!(window.matches_lower_bound()?, 11);
    assert_eq!(window.matches_estimated()?, 193);
    assert!(window.matches_upper_bound()? > 193);
    assert!(!window.estimate_is_exact()?);
    // All statistics came from one request.
    assert_eq!(target.request_count(), 1);

    let exact = window.check_at_least(-1)?;
    assert!(exact.estimate_is_exact()?);
    assert_eq!(exact.matches_lower_bound()?, 193);
    assert_eq!(exact.matches_upper_bound()?, 193);

    Ok(())
}

#[test]
fn test_iterate_every_document() -> Result<()> {
    let target = NumTarget::new(193);
    let q = target.all().searchable();

    let results = q.iter().collect::<Result<Vec<_>>>()?;
    assert_eq!(results.len(), 193);
    for (rank, result) in results.iter().enumerate() {
        assert_eq!(result.rank(), rank as u64);
        assert_eq!(num_of(result), Some(rank as u64));
    }
    // One request per page of ten.
    assert_eq!(target.request_count(), 20);

    Ok(())
}

#[test]
fn test_iterate_with_page_size() -> Result<()> {
    let target = NumTarget::new(193);
    let q = target.all().searchable().with_page_size(50)?;

    assert_eq!(q.iter().count(), 193);
    assert_eq!(target.request_count(), 4);
    assert!(target.all().searchable().with_page_size(0).is_err());

    Ok(())
}

#[test]
fn test_iterate_tail_slice() -> Result<()> {
    let target = NumTarget::new(193);
    let tail = target.all().slice(185..)?;

    let nums: Vec<u64> = (&tail)
        .into_iter()
        .map(|result| result.map(|result| num_of(&result).unwrap_or(u64::MAX)))
        .collect::<Result<_>>()?;
    assert_eq!(nums, (185..193).collect::<Vec<_>>());

    Ok(())
}

#[test]
fn test_iterate_middle_slice() -> Result<()> {
    let target = NumTarget::new(193);
    let window = target.all().order_by("num", None).slice(10..20)?;

    let nums: Vec<u64> = window
        .iter()
        .map(|result| result.map(|result| num_of(&result).unwrap_or(u64::MAX)))
        .collect::<Result<_>>()?;
    assert_eq!(nums, (10..20).collect::<Vec<_>>());
    assert_eq!(target.last_request()["from"], json!(10));

    Ok(())
}

#[test]
fn test_negative_index_is_rejected_without_request() -> Result<()> {
    let target = NumTarget::new(193);
    let q = target.all().searchable();

    assert!(q.get(-1).unwrap_err().is_out_of_range());
    assert!(q.slice(0..10)?.get(-5).unwrap_err().is_out_of_range());
    assert_eq!(target.request_count(), 0);

    Ok(())
}

#[test]
fn test_range_query() -> Result<()> {
    let target = NumTarget::new(193);
    let q = target.field("num").range(10, 100).order_by("num", None);

    assert_eq!(q.len()?, 91);
    assert_eq!(num_of(&q.get(0)?), Some(10));
    assert_eq!(num_of(&q.get(90)?), Some(100));

    let either = target.field("num").equals(3).or(target.field("num").equals(7))?;
    let nums: Vec<u64> = either
        .searchable()
        .iter()
        .map(|result| result.map(|result| num_of(&result).unwrap_or(u64::MAX)))
        .collect::<Result<_>>()?;
    assert_eq!(nums, vec![3, 7]);

    Ok(())
}

#[test]
fn test_fromdoc() -> Result<()> {
    let target = NumTarget::new(193);
    let q = target.field("num").range(10, 100).order_by("num", None);

    let q1 = q.fromdoc("num", "60", -5, 10, None)?;
    assert_eq!(q1.len()?, 10);
    assert_eq!(q1.get(0)?.rank(), 45);
    assert_eq!(num_of(&q1.get(0)?), Some(55));

    let q2 = q1.slice(5..)?;
    assert_eq!(q2.len()?, 5);
    assert_eq!(q2.get(0)?.rank(), 50);
    assert_eq!(num_of(&q2.get(0)?), Some(60));

    let q3 = q1.slice(5..6)?;
    assert_eq!(q3.len()?, 1);
    assert_eq!(num_of(&q3.get(0)?), Some(60));
    assert!(q3.get(1).unwrap_err().is_out_of_range());

    assert!(matches!(
        q.slice(..10)?.fromdoc("num", "60", -5, 10, None),
        Err(RestPoseError::InvalidOperation(_))
    ));
    assert!(matches!(
        q.slice(10..)?.fromdoc("num", "60", -5, 10, None),
        Err(RestPoseError::InvalidOperation(_))
    ));
    assert!(matches!(
        q.fromdoc("num", "110", -5, 10, None)?.get(0),
        Err(RestPoseError::RequestFailed { status: 400, .. })
    ));

    Ok(())
}

#[test]
fn test_realiser_fills_page_once() -> Result<()> {
    let target = NumTarget::new(193);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let q = target.all().with_realiser(realiser(move |_needed, wanted| {
        counter.fetch_add(1, Ordering::SeqCst);
        for result in wanted {
            result.set_object(Arc::new(format!("doc {}", result.rank())));
        }
        Ok(())
    }));

    assert_eq!(*q.get(3)?.object_as::<String>()?, "doc 3");
    assert_eq!(*q.get(4)?.object_as::<String>()?, "doc 4");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The next page needs a fresh realisation.
    assert_eq!(*q.get(12)?.object_as::<String>()?, "doc 12");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    Ok(())
}

#[test]
fn test_realisation_failures() -> Result<()> {
    let target = NumTarget::new(193);

    assert!(matches!(
        target.all().searchable().get(0)?.object(),
        Err(RestPoseError::Realisation(_))
    ));

    let lazy = target.all().with_realiser(realiser(|_needed, _wanted| Ok(())));
    assert!(matches!(lazy.get(0)?.object(), Err(RestPoseError::Realisation(_))));

    Ok(())
}

#[test]
fn test_unbound_query_needs_target() -> Result<()> {
    let q = Query::all().slice(0..10)?;
    assert!(matches!(q.len(), Err(RestPoseError::MissingTarget)));

    let target = NumTarget::new(193);
    let results = target.search_with(&q)?;
    assert_eq!(results.len(), 10);
    assert_eq!(results.matches_estimated(), 193);

    Ok(())
}

#[test]
fn test_queries_on_different_targets_do_not_combine() {
    let first = NumTarget::new(10);
    let second = NumTarget::new(10);

    assert!(matches!(
        first.all().and(second.all()),
        Err(RestPoseError::InconsistentTarget)
    ));
    assert!(first.all().and(first.field("num").equals(1)).is_ok());
}
