use std::convert::Infallible;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Barrier;

use ordo_queue::{LaunchDomain, StreamKey, TaskPriority};

use crate::common::StartLog;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_launchers_on_one_stream_share_a_queue() {
    let domain = Arc::new(LaunchDomain::new());
    let stream = StreamKey::from("shared");
    let barrier = Arc::new(Barrier::new(8));

    let launchers: Vec<_> = (0..8)
        .map(|_| {
            let domain = domain.clone();
            let stream = stream.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                domain.queue(&stream)
            })
        })
        .collect();

    let queues: Vec<_> = join_all(launchers)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();
    assert!(queues.iter().all(|q| q.same_queue(&queues[0])));
    assert_eq!(domain.streams(), vec![stream]);
}

#[tokio::test]
async fn each_stream_keeps_its_own_order() {
    let domain = LaunchDomain::new().with_default_priority(TaskPriority::Low);
    let uploads = StreamKey::from("uploads");
    let downloads = StreamKey::from("downloads");
    let upload_log = StartLog::default();
    let download_log = StartLog::default();

    let mut handles = Vec::new();
    for i in 0..6u64 {
        let (stream, log) = if i % 2 == 0 {
            (&uploads, upload_log.clone())
        } else {
            (&downloads, download_log.clone())
        };
        let handle = domain.launch(Some(stream), None, move || async move {
            log.record(i);
            Ok::<_, Infallible>(())
        });
        assert_eq!(handle.priority(), TaskPriority::Low);
        handles.push(handle);
    }
    for handle in join_all(handles).await {
        handle.unwrap();
    }

    assert_eq!(upload_log.snapshot(), vec![0, 2, 4]);
    assert_eq!(download_log.snapshot(), vec![1, 3, 5]);
    assert_eq!(domain.streams(), vec![downloads, uploads]);
}
