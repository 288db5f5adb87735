mod common;

use accident_ingest::pipeline::PreviewOutcome;
use accident_ingest::{
    ImportController, ImportError, ImportState, SelectedFile, Submitter, UploadError,
    UploadReceipt,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Answers every submit with a fixed result, counting calls.
struct FixedSubmitter {
    row_count: Option<u64>,
    calls: AtomicUsize,
}

impl FixedSubmitter {
    fn ok(row_count: u64) -> Self {
        Self {
            row_count: Some(row_count),
            calls: AtomicUsize::new(0),
        }
    }

    fn server_error() -> Self {
        Self {
            row_count: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Submitter for FixedSubmitter {
    async fn submit(&self, _file: &SelectedFile) -> Result<UploadReceipt, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.row_count {
            Some(row_count) => Ok(UploadReceipt {
                row_count,
                message: None,
            }),
            None => Err(UploadError::Rejected {
                status: 500,
                message: Some("Internal Server Error".to_string()),
            }),
        }
    }
}

/// Holds every submit until the gate opens.
struct GatedSubmitter {
    gate: Notify,
    row_count: u64,
}

#[async_trait]
impl Submitter for GatedSubmitter {
    async fn submit(&self, _file: &SelectedFile) -> Result<UploadReceipt, UploadError> {
        self.gate.notified().await;
        Ok(UploadReceipt {
            row_count: self.row_count,
            message: None,
        })
    }
}

/// Never answers.
struct StalledSubmitter;

#[async_trait]
impl Submitter for StalledSubmitter {
    async fn submit(&self, _file: &SelectedFile) -> Result<UploadReceipt, UploadError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn template_file_reaches_valid() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = common::write_csv(dir.path(), "ok.csv", common::HEADER, 1)?;
    let controller = ImportController::new(FixedSubmitter::ok(1));

    assert_eq!(controller.state(), ImportState::Idle);
    let state = controller.open(SelectedFile::open(&path).await?).await?;

    assert_eq!(state, ImportState::Valid);
    let session = controller.session();
    assert!(session.missing_columns().is_empty());
    assert_eq!(session.preview_rows().len(), 1);
    assert_eq!(session.header_columns().len(), 10);
    assert!(session.error_message().is_none());
    assert!(session.result_row_count().is_none());
    Ok(())
}

#[tokio::test]
async fn missing_speed_limit_is_invalid_and_cannot_submit() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let header = common::header_without("speed_limit");
    let path = common::write_csv(dir.path(), "partial.csv", &header, 3)?;
    let submitter = FixedSubmitter::ok(3);
    let controller = ImportController::new(submitter);

    let state = controller.open(SelectedFile::open(&path).await?).await?;
    assert_eq!(state, ImportState::Invalid);

    let session = controller.session();
    let missing: Vec<&str> = session.missing_columns().iter().map(String::as_str).collect();
    assert_eq!(missing, ["speed_limit"]);

    let err = controller.submit().await.unwrap_err();
    match err {
        ImportError::Validation { missing } => assert_eq!(missing, ["speed_limit"]),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(controller.state(), ImportState::Invalid);
    Ok(())
}

#[tokio::test]
async fn reported_count_lands_in_succeeded() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = common::write_csv(dir.path(), "three.csv", common::HEADER, 3)?;
    let controller = ImportController::new(FixedSubmitter::ok(3));

    controller.open(SelectedFile::open(&path).await?).await?;
    let receipt = controller.submit().await?;

    assert_eq!(receipt.row_count, 3);
    let session = controller.session();
    assert_eq!(session.state(), ImportState::Succeeded);
    assert_eq!(session.result_row_count(), Some(3));
    Ok(())
}

#[tokio::test]
async fn server_error_lands_in_failed() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = common::write_csv(dir.path(), "three.csv", common::HEADER, 3)?;
    let controller = ImportController::new(FixedSubmitter::server_error());

    controller.open(SelectedFile::open(&path).await?).await?;
    let err = controller.submit().await.unwrap_err();
    assert!(matches!(
        err,
        ImportError::Upload(UploadError::Rejected { status: 500, .. })
    ));

    let session = controller.session();
    assert_eq!(session.state(), ImportState::Failed);
    assert!(session
        .error_message()
        .is_some_and(|m| m.contains("Internal Server Error")));
    assert_eq!(session.result_row_count(), None);

    // no automatic retry: the session stays failed until a new selection
    assert!(matches!(
        controller.submit().await,
        Err(ImportError::InvalidTransition { state: ImportState::Failed, .. })
    ));
    Ok(())
}

#[tokio::test]
async fn second_submit_while_uploading_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = common::write_csv(dir.path(), "three.csv", common::HEADER, 3)?;
    let controller = ImportController::new(GatedSubmitter {
        gate: Notify::new(),
        row_count: 3,
    });
    controller.open(SelectedFile::open(&path).await?).await?;
    let other = SelectedFile::open(&path).await?;

    let first = controller.submit();
    let interloper = async {
        // join! polls `first` before this block, so the upload is in flight
        assert_eq!(controller.state(), ImportState::Uploading);
        let second = controller.submit().await;
        let reselect = controller.select(other).err();
        assert_eq!(controller.state(), ImportState::Uploading);
        (second, reselect)
    };

    let (first, (second, reselect)) = tokio::join!(first, async {
        let out = interloper.await;
        controller_gate(&controller);
        out
    });

    assert!(matches!(second, Err(ImportError::ConcurrentOperation)));
    assert!(matches!(reselect, Some(ImportError::ConcurrentOperation)));
    assert_eq!(first?.row_count, 3);
    assert_eq!(controller.state(), ImportState::Succeeded);
    assert_eq!(controller.session().result_row_count(), Some(3));
    Ok(())
}

fn controller_gate(controller: &ImportController<GatedSubmitter>) {
    controller.submitter().gate.notify_one();
}

#[tokio::test]
async fn stale_preview_is_discarded() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let bad = common::write_csv(dir.path(), "bad.csv", &common::header_without("date"), 2)?;
    let good = common::write_csv(dir.path(), "good.csv", common::HEADER, 2)?;
    let controller = ImportController::new(FixedSubmitter::ok(2));

    let first = controller.select(SelectedFile::open(&bad).await?)?;
    let second = controller.select(SelectedFile::open(&good).await?)?;
    assert!(second.generation() > first.generation());

    // the first parse resolves after it was superseded
    let late = first.parse().await;
    assert_eq!(controller.apply_preview(late), PreviewOutcome::Stale);
    assert_eq!(controller.state(), ImportState::Selected);
    assert!(controller.session().missing_columns().is_empty());

    let current = second.parse().await;
    assert_eq!(
        controller.apply_preview(current),
        PreviewOutcome::Applied(ImportState::Valid)
    );
    Ok(())
}

#[tokio::test]
async fn reselection_replaces_the_session() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let bad = common::write_csv(dir.path(), "bad.csv", &common::header_without("latitude"), 2)?;
    let good = common::write_csv(dir.path(), "good.csv", common::HEADER, 4)?;
    let controller = ImportController::new(FixedSubmitter::ok(4));

    assert_eq!(controller.open(SelectedFile::open(&bad).await?).await?, ImportState::Invalid);
    assert!(controller.session().error_message().is_some());

    assert_eq!(controller.open(SelectedFile::open(&good).await?).await?, ImportState::Valid);
    let session = controller.session();
    assert!(session.missing_columns().is_empty());
    assert!(session.error_message().is_none());
    assert_eq!(session.preview_rows().len(), 4);

    controller.submit().await?;
    assert_eq!(controller.state(), ImportState::Succeeded);

    // a finished session accepts a new file and starts clean
    controller.open(SelectedFile::open(&bad).await?).await?;
    let session = controller.session();
    assert_eq!(session.state(), ImportState::Invalid);
    assert!(session.result_row_count().is_none());
    Ok(())
}

#[tokio::test]
async fn parse_failure_is_invalid_with_message() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("empty.csv");
    std::fs::File::create(&path)?;
    let controller = ImportController::new(FixedSubmitter::ok(0));

    let state = controller.open(SelectedFile::open(&path).await?).await?;
    assert_eq!(state, ImportState::Invalid);
    let session = controller.session();
    assert!(session.missing_columns().is_empty());
    assert!(session
        .error_message()
        .is_some_and(|m| m.starts_with("Error parsing CSV file")));
    assert!(matches!(
        controller.submit().await,
        Err(ImportError::InvalidTransition { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn non_csv_selection_is_refused() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = common::write_csv(dir.path(), "accidents.txt", common::HEADER, 1)?;
    let submitter = FixedSubmitter::ok(1);
    let controller = ImportController::new(submitter);

    let err = controller.select(SelectedFile::open(&path).await?).unwrap_err();
    assert!(matches!(err, ImportError::NotCsv { .. }));
    assert_eq!(controller.state(), ImportState::Idle);
    assert_eq!(controller.submitter().calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn preview_limit_bounds_rows() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = common::write_csv(dir.path(), "many.csv", common::HEADER, 50)?;
    let controller = ImportController::new(FixedSubmitter::ok(50)).with_preview_limit(3);

    controller.open(SelectedFile::open(&path).await?).await?;
    assert_eq!(controller.session().preview_rows().len(), 3);
    Ok(())
}

#[tokio::test]
async fn preview_limit_cannot_exceed_default() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = common::write_csv(dir.path(), "many.csv", common::HEADER, 50)?;
    let controller = ImportController::new(FixedSubmitter::ok(50)).with_preview_limit(10);

    controller.open(SelectedFile::open(&path).await?).await?;
    assert_eq!(controller.session().preview_rows().len(), 5);
    Ok(())
}

#[tokio::test]
async fn dropped_submit_releases_the_session() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = common::write_csv(dir.path(), "three.csv", common::HEADER, 3)?;
    let controller = ImportController::new(StalledSubmitter);
    controller.open(SelectedFile::open(&path).await?).await?;

    let timed_out =
        tokio::time::timeout(std::time::Duration::from_millis(50), controller.submit()).await;
    assert!(timed_out.is_err());

    let session = controller.session();
    assert_eq!(session.state(), ImportState::Failed);
    assert!(session
        .error_message()
        .is_some_and(|m| m.contains("upload cancelled")));
    assert_eq!(session.result_row_count(), None);

    assert!(matches!(
        controller.submit().await,
        Err(ImportError::InvalidTransition { state: ImportState::Failed, .. })
    ));
    assert_eq!(
        controller.open(SelectedFile::open(&path).await?).await?,
        ImportState::Valid
    );
    Ok(())
}
