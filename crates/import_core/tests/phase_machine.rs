use import_core::{ImportEvent, ImportPhase, JobStatus};

fn init_logging() {
    import_logging::initialize_for_tests();
}

fn polling(job_id: &str) -> ImportPhase {
    ImportPhase::Idle
        .advance(ImportEvent::SubmitStarted)
        .and_then(|phase| {
            phase.advance(ImportEvent::JobAccepted {
                job_id: job_id.to_string(),
            })
        })
        .expect("idle -> submitting -> polling")
}

#[test]
fn happy_path_reaches_succeeded() {
    init_logging();
    let phase = polling("job-7");
    assert_eq!(phase.job_id(), Some("job-7"));
    assert!(!phase.is_terminal());

    let phase = phase
        .advance(ImportEvent::StatusObserved {
            status: JobStatus::Queued,
        })
        .unwrap()
        .advance(ImportEvent::StatusObserved {
            status: JobStatus::Working,
        })
        .unwrap();
    assert_eq!(
        phase,
        ImportPhase::Polling {
            job_id: "job-7".to_string(),
            last_status: Some(JobStatus::Working),
        }
    );

    let done = phase
        .advance(ImportEvent::StatusObserved {
            status: JobStatus::Success,
        })
        .unwrap();
    assert_eq!(done, ImportPhase::Succeeded);
    assert!(done.is_terminal());
}

#[test]
fn domain_error_is_its_own_terminal_phase() {
    let phase = polling("j")
        .advance(ImportEvent::StatusObserved {
            status: JobStatus::Error,
        })
        .unwrap();
    assert_eq!(phase, ImportPhase::DomainErrored);
}

#[test]
fn submission_failure_skips_polling() {
    let phase = ImportPhase::Idle
        .advance(ImportEvent::SubmitStarted)
        .unwrap()
        .advance(ImportEvent::TransportFailed)
        .unwrap();
    assert_eq!(phase, ImportPhase::TransportFailed);
}

#[test]
fn timeout_only_applies_while_polling() {
    let submitting = ImportPhase::Idle.advance(ImportEvent::SubmitStarted).unwrap();
    assert!(submitting.advance(ImportEvent::TimedOut).is_err());

    let timed_out = polling("j").advance(ImportEvent::TimedOut).unwrap();
    assert_eq!(timed_out, ImportPhase::TimedOut);
}

#[test]
fn terminal_phases_reject_every_event() {
    let terminals = [
        ImportPhase::Succeeded,
        ImportPhase::DomainErrored,
        ImportPhase::TransportFailed,
        ImportPhase::TimedOut,
        ImportPhase::Cancelled,
    ];
    let events = [
        ImportEvent::SubmitStarted,
        ImportEvent::JobAccepted {
            job_id: "x".to_string(),
        },
        ImportEvent::StatusObserved {
            status: JobStatus::Working,
        },
        ImportEvent::TransportFailed,
        ImportEvent::TimedOut,
        ImportEvent::Cancelled,
    ];

    for terminal in terminals {
        for event in events.iter().cloned() {
            let err = terminal.clone().advance(event.clone()).unwrap_err();
            assert_eq!(err.from, terminal);
            assert_eq!(err.event, event);
        }
    }
}

#[test]
fn idle_only_accepts_submit_start() {
    assert!(ImportPhase::Idle
        .advance(ImportEvent::JobAccepted {
            job_id: "j".to_string()
        })
        .is_err());
    assert!(ImportPhase::Idle.advance(ImportEvent::Cancelled).is_err());
}
