use breadboard::errors::{QueryError, RunUpdateError};
use breadboard::types::RunId;
use breadboard::{RunQuery, RunTableOptions};
use futures::TryStreamExt;
use mockito::Matcher;
use serde_json::{json, Map, Value};

mod helpers;
use helpers::{client_for, page_json, run_json, AnyResult, LAB};

fn runtime_of(id: u32) -> String {
    format!("2019-03-06T19:00:{:02}Z", id)
}

fn ids(ids: &[u32]) -> Vec<RunId> {
    ids.iter().copied().map(RunId::from).collect()
}

fn run_ids(table: &breadboard::FlatTable) -> Vec<Value> {
    table.column("run_id").map(|v| v.cloned().unwrap_or(Value::Null)).collect()
}

#[tokio::test]
async fn test_run_table_list_bound_only() -> AnyResult {
    let mut server = mockito::Server::new_async().await;
    let runs = vec![
        run_json(2, &runtime_of(2), json!({"ListBoundVariables": ["tof"], "tof": 6.0, "hold": 1})),
        run_json(1, &runtime_of(1), json!({"ListBoundVariables": ["detuning"], "detuning": -3})),
    ];
    let mock = server
        .mock("GET", "/runs/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("lab".into(), LAB.into()),
            Matcher::UrlEncoded("limit".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(page_json(runs, None).to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    let table = client
        .build_run_table(&RunQuery::new().limit(2), &RunTableOptions::default())
        .await?;
    mock.assert_async().await;

    assert_eq!(table.columns(), ["runtime", "x", "detuning", "tof", "unixtime"]);
    assert!(!table.has_column("hold"));
    assert!(!table.has_column("ListBoundVariables"));
    assert_eq!(table.get(0, "runtime"), Some(&json!(runtime_of(1))));
    assert_eq!(table.get(0, "tof"), Some(&Value::Null));
    assert_eq!(table.get(1, "tof"), Some(&json!(6.0)));
    assert_eq!(table.get(1, "x"), table.get(1, "unixtime"));
    Ok(())
}

#[tokio::test]
async fn test_query_runs_reports_detail() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/runs/")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"detail": "Authentication credentials were not provided."}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.query_runs(&RunQuery::new()).await.unwrap_err();
    match err {
        QueryError::Remote { status, detail } => {
            assert_eq!(status.as_u16(), 403);
            assert_eq!(detail, "Authentication credentials were not provided.");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_query_runs_empty_results() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/runs/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(page_json(vec![], None).to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client.query_runs(&RunQuery::new().filter("badshot", true)).await;
    assert!(matches!(result, Err(QueryError::Remote { .. })));
}

#[tokio::test]
async fn test_stream_runs_follows_next() -> AnyResult {
    let mut server = mockito::Server::new_async().await;
    let next = format!("{}/runs/?page=2", server.url());
    let first = server
        .mock("GET", "/runs/")
        .match_query(Matcher::UrlEncoded("lab".into(), LAB.into()))
        .with_status(200)
        .with_body(
            page_json(
                vec![run_json(4, &runtime_of(4), json!({})), run_json(3, &runtime_of(3), json!({}))],
                Some(next),
            )
            .to_string(),
        )
        .create_async()
        .await;
    let second = server
        .mock("GET", "/runs/")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_status(200)
        .with_body(page_json(vec![run_json(2, &runtime_of(2), json!({}))], None).to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    let runs: Vec<_> = client.stream_runs(RunQuery::new()).try_collect().await?;
    first.assert_async().await;
    second.assert_async().await;
    let found: Vec<u32> = runs.iter().map(|r| r.id.0).collect();
    assert_eq!(found, vec![4, 3, 2]);
    Ok(())
}

#[tokio::test]
async fn test_small_batch_keeps_order() -> AnyResult {
    let mut server = mockito::Server::new_async().await;
    let mut mocks = Vec::new();
    for id in [3, 1, 2] {
        let run = run_json(id, &runtime_of(id), json!({"manual_note": id * 10}));
        let mock = server
            .mock("GET", format!("/runs/{}/", id).as_str())
            .with_status(200)
            .with_body(run.to_string())
            .expect(1)
            .create_async()
            .await;
        mocks.push(mock);
    }

    let client = client_for(&server);
    let table = client.get_runs_by_ids(&ids(&[3, 1, 2]), &[]).await?;
    for mock in mocks {
        mock.assert_async().await;
    }
    assert_eq!(run_ids(&table), vec![json!(3), json!(1), json!(2)]);
    assert_eq!(table.get(0, "manual_note"), Some(&json!(30)));
    assert_eq!(table.get(0, "badshot"), Some(&json!(false)));
    assert_eq!(table.get(2, "runtime"), Some(&json!(runtime_of(2))));
    Ok(())
}

#[tokio::test]
async fn test_empty_batch_sends_nothing() -> AnyResult {
    let server = mockito::Server::new_async().await;
    let client = client_for(&server);
    let table = client.get_runs_by_ids(&[], &["camera"]).await?;
    assert!(table.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_single_run_is_one_request() -> AnyResult {
    let mut server = mockito::Server::new_async().await;
    let get = server
        .mock("GET", "/runs/5/")
        .with_status(200)
        .with_body(run_json(5, &runtime_of(5), json!({"hold": 1})).to_string())
        .expect(1)
        .create_async()
        .await;
    let range = server
        .mock("GET", "/runs/")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server);
    let table = client.get_runs_by_ids(&ids(&[5]), &["hold"]).await?;
    get.assert_async().await;
    range.assert_async().await;
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(0, "run_id"), Some(&json!(5)));
    assert_eq!(table.get(0, "hold"), Some(&json!(1)));
    Ok(())
}

#[tokio::test]
async fn test_missing_run_in_small_batch() -> AnyResult {
    let mut server = mockito::Server::new_async().await;
    let mut mocks = Vec::new();
    for id in [1, 3] {
        let mock = server
            .mock("GET", format!("/runs/{}/", id).as_str())
            .with_status(200)
            .with_body(run_json(id, &runtime_of(id), json!({})).to_string())
            .create_async()
            .await;
        mocks.push(mock);
    }
    let not_found = server
        .mock("GET", "/runs/2/")
        .with_status(404)
        .with_body(r#"{"detail": "Not found."}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let table = client.get_runs_by_ids(&ids(&[1, 2, 3]), &[]).await?;
    not_found.assert_async().await;
    for mock in mocks {
        mock.assert_async().await;
    }
    assert_eq!(run_ids(&table), vec![json!(1), json!(2), json!(3)]);
    assert_eq!(table.rows()[1].len(), 1);
    assert_eq!(table.get(1, "runtime"), None);
    assert_eq!(table.get(2, "runtime"), Some(&json!(runtime_of(3))));
    Ok(())
}

#[tokio::test]
async fn test_small_batch_server_error_fails() {
    let mut server = mockito::Server::new_async().await;
    let _ok = server
        .mock("GET", "/runs/1/")
        .with_status(200)
        .with_body(run_json(1, &runtime_of(1), json!({})).to_string())
        .create_async()
        .await;
    let _broken = server
        .mock("GET", "/runs/2/")
        .with_status(500)
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client.get_runs_by_ids(&ids(&[1, 2]), &[]).await;
    assert!(matches!(result, Err(QueryError::Transport(_))));
}

#[tokio::test]
async fn test_large_batch_uses_range_query() -> AnyResult {
    let mut server = mockito::Server::new_async().await;
    let wanted = [10, 11, 12, 13, 14, 15, 18, 20];
    let run = |id: u32| run_json(id, &runtime_of(id), json!({"ListBoundVariables": ["tof"], "tof": id}));

    let mut bounds = Vec::new();
    for id in [10, 20] {
        let mock = server
            .mock("GET", format!("/runs/{}/", id).as_str())
            .with_status(200)
            .with_body(run(id).to_string())
            .create_async()
            .await;
        bounds.push(mock);
    }
    // run 18 is missing from the range, and runs 16, 17, 19 were not asked for
    let in_range: Vec<Value> = (10..=20).rev().filter(|id| *id != 18).map(run).collect();
    let range = server
        .mock("GET", "/runs/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("lab".into(), LAB.into()),
            Matcher::UrlEncoded("start_datetime".into(), runtime_of(10)),
            Matcher::UrlEncoded("end_datetime".into(), runtime_of(20)),
            Matcher::UrlEncoded("limit".into(), "11".into()),
        ]))
        .with_status(200)
        .with_body(page_json(in_range, None).to_string())
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server);
    let table = client.get_runs_by_ids(&ids(&wanted), &[]).await?;
    range.assert_async().await;
    for mock in bounds {
        mock.assert_async().await;
    }

    assert_eq!(run_ids(&table), wanted.map(|id| json!(id)).to_vec());
    assert_eq!(table.get(0, "tof"), Some(&json!(10)));
    assert_eq!(table.get(7, "runtime"), Some(&json!(runtime_of(20))));
    assert_eq!(table.rows()[6].len(), 1);
    assert_eq!(table.get(6, "tof"), None);
    Ok(())
}

#[tokio::test]
async fn test_range_query_keeps_fractional_runtimes() -> AnyResult {
    let mut server = mockito::Server::new_async().await;
    let runtime = |id: u32| format!("2019-03-06T19:00:{:02}.750000Z", id);
    let run = |id: u32| run_json(id, &runtime(id), json!({}));

    let mut bounds = Vec::new();
    for id in [10, 20] {
        let mock = server
            .mock("GET", format!("/runs/{}/", id).as_str())
            .with_status(200)
            .with_body(run(id).to_string())
            .create_async()
            .await;
        bounds.push(mock);
    }
    let range = server
        .mock("GET", "/runs/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("start_datetime".into(), runtime(10)),
            Matcher::UrlEncoded("end_datetime".into(), runtime(20)),
            Matcher::UrlEncoded("limit".into(), "11".into()),
        ]))
        .with_status(200)
        .with_body(page_json((10..=20).rev().map(run).collect(), None).to_string())
        .expect(1)
        .create_async()
        .await;

    let wanted: Vec<u32> = (10..=20).collect();
    let client = client_for(&server);
    let table = client.get_runs_by_ids(&ids(&wanted), &[]).await?;
    range.assert_async().await;
    for mock in bounds {
        mock.assert_async().await;
    }
    assert_eq!(table.len(), 11);
    assert_eq!(table.get(10, "runtime"), Some(&json!(runtime(20))));
    Ok(())
}

/// Serves runs 10 to 20 both by ID and as a range.
async fn serve_runs(server: &mut mockito::ServerGuard) -> Vec<mockito::Mock> {
    let run = |id: u32| run_json(id, &runtime_of(id), json!({"ListBoundVariables": ["tof"], "tof": id}));
    let mut mocks = Vec::new();
    for id in 10..=20 {
        let mock = server
            .mock("GET", format!("/runs/{}/", id).as_str())
            .with_status(200)
            .with_body(run(id).to_string())
            .create_async()
            .await;
        mocks.push(mock);
    }
    let range = server
        .mock("GET", "/runs/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(page_json((10..=20).rev().map(run).collect(), None).to_string())
        .create_async()
        .await;
    mocks.push(range);
    mocks
}

#[tokio::test]
async fn test_strategies_agree() -> AnyResult {
    let mut server = mockito::Server::new_async().await;
    let _mocks = serve_runs(&mut server).await;
    let client = client_for(&server);

    let wanted = ids(&[20, 12, 15, 10, 11, 13, 14, 18]);
    let per_id = client.get_runs_by_ids(&wanted[..7], &[]).await?;
    let range = client.get_runs_by_ids(&wanted, &[]).await?;
    assert_eq!(per_id.len(), 7);
    assert_eq!(range.len(), 8);
    assert_eq!(per_id.rows(), &range.rows()[..7]);
    assert_eq!(range.get(7, "run_id"), Some(&json!(18)));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_ids_are_kept() -> AnyResult {
    let mut server = mockito::Server::new_async().await;
    let _mocks = serve_runs(&mut server).await;
    let client = client_for(&server);

    let per_id = client.get_runs_by_ids(&ids(&[12, 11, 12]), &[]).await?;
    assert_eq!(run_ids(&per_id), vec![json!(12), json!(11), json!(12)]);

    let wanted = [12, 11, 12, 13, 14, 15, 16, 17];
    let range = client.get_runs_by_ids(&ids(&wanted), &[]).await?;
    assert_eq!(run_ids(&range), wanted.map(|id| json!(id)).to_vec());
    assert_eq!(range.rows()[0], range.rows()[2]);
    Ok(())
}

#[tokio::test]
async fn test_attach_analysis() -> AnyResult {
    let mut server = mockito::Server::new_async().await;
    let before = run_json(
        5,
        &runtime_of(5),
        json!({"ListBoundVariables": ["tof"], "tof": 5, "analyzed_variables": ["od_peak"], "od_peak": 1.5}),
    );
    let after = run_json(
        5,
        &runtime_of(5),
        json!({
            "ListBoundVariables": ["tof"],
            "tof": 5,
            "analyzed_variables": ["od_peak", "atom_number"],
            "od_peak": 1.5,
            "atom_number": 120000.0
        }),
    );
    let get = server
        .mock("GET", "/runs/5/")
        .with_status(200)
        .with_body(before.to_string())
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/runs/5/")
        .match_body(Matcher::PartialJson(json!({
            "id": 5,
            "parameters": {
                "analyzed_variables": ["od_peak", "atom_number"],
                "atom_number": 120000.0,
                "tof": 5
            }
        })))
        .with_status(200)
        .with_body(after.to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    let mut analysis = Map::new();
    analysis.insert("atom_number".to_string(), json!(120000.0));
    let updated = client.attach_analysis(RunId::from(5), &analysis).await?;

    get.assert_async().await;
    put.assert_async().await;
    assert_eq!(updated.parameters["atom_number"], json!(120000.0));
    Ok(())
}

#[tokio::test]
async fn test_attach_analysis_empty_response() -> AnyResult {
    let mut server = mockito::Server::new_async().await;
    let before = run_json(4, &runtime_of(4), json!({"ListBoundVariables": ["tof"], "tof": 4}));
    let _get = server
        .mock("GET", "/runs/4/")
        .with_status(200)
        .with_body(before.to_string())
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/runs/4/")
        .match_body(Matcher::PartialJson(json!({
            "parameters": {"analyzed_variables": ["od_peak"], "od_peak": 2.0}
        })))
        .with_status(204)
        .create_async()
        .await;

    let client = client_for(&server);
    let mut analysis = Map::new();
    analysis.insert("od_peak".to_string(), json!(2.0));
    let updated = client.attach_analysis(RunId::from(4), &analysis).await?;

    put.assert_async().await;
    assert_eq!(updated.id, RunId::from(4));
    assert_eq!(updated.parameters["od_peak"], json!(2.0));
    assert_eq!(updated.parameters["tof"], json!(4));
    Ok(())
}

#[tokio::test]
async fn test_attach_instrument_readout() -> AnyResult {
    let mut server = mockito::Server::new_async().await;
    let before = run_json(
        9,
        &runtime_of(9),
        json!({"instrument_names": ["laser_in_mW"], "laser_in_mW": 20.0}),
    );
    let get = server
        .mock("GET", "/runs/9/")
        .with_status(200)
        .with_body(before.to_string())
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/runs/9/")
        .match_body(Matcher::PartialJson(json!({
            "id": 9,
            "parameters": {
                "instrument_names": ["laser_in_mW", "wavemeter_in_THz"],
                "laser_in_mW": 20.0,
                "wavemeter_in_THz": 446.8
            }
        })))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server);
    let mut readings = Map::new();
    readings.insert("wavemeter_in_THz".to_string(), json!(446.8));
    let updated = client
        .attach_instrument_readout(RunId::from(9), &readings)
        .await?;

    get.assert_async().await;
    put.assert_async().await;
    assert_eq!(
        updated.parameters["instrument_names"],
        json!(["laser_in_mW", "wavemeter_in_THz"])
    );
    assert_eq!(updated.parameters["wavemeter_in_THz"], json!(446.8));
    Ok(())
}

#[tokio::test]
async fn test_attach_images_then_measurement_name() -> AnyResult {
    let mut server = mockito::Server::new_async().await;
    let run = run_json(6, &runtime_of(6), json!({"image_filenames": ["a.spe"]}));
    let get = server
        .mock("GET", "/runs/6/")
        .with_status(200)
        .with_body(run.to_string())
        .expect(2)
        .create_async()
        .await;
    let put_images = server
        .mock("PUT", "/runs/6/")
        .match_body(Matcher::PartialJson(json!({
            "parameters": {"image_filenames": ["a.spe", "b.spe"]}
        })))
        .with_status(200)
        .with_body(run.to_string())
        .create_async()
        .await;
    let put_name = server
        .mock("PUT", "/runs/6/")
        .match_body(Matcher::PartialJson(json!({
            "parameters": {"measurement_name": "mott_scan"}
        })))
        .with_status(200)
        .with_body(run.to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    client
        .attach_images(RunId::from(6), ["a.spe", "b.spe"], Some("mott_scan"))
        .await?;
    get.assert_async().await;
    put_images.assert_async().await;
    put_name.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_measurement_name_is_set_once() {
    let mut server = mockito::Server::new_async().await;
    let run = run_json(7, &runtime_of(7), json!({"measurement_name": "first"}));
    let _get = server
        .mock("GET", "/runs/7/")
        .with_status(200)
        .with_body(run.to_string())
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/runs/7/")
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .attach_measurement_name(RunId::from(7), "second")
        .await
        .unwrap_err();
    put.assert_async().await;
    match err {
        RunUpdateError::DuplicateMeasurementName { run_id, existing } => {
            assert_eq!(run_id, RunId::from(7));
            assert_eq!(existing, "first");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_instrument_key_sends_nothing() {
    let mut server = mockito::Server::new_async().await;
    let get = server
        .mock("GET", "/runs/8/")
        .expect(0)
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/runs/8/")
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server);
    let mut readings = Map::new();
    readings.insert("wavemeter_in_THz".to_string(), json!(446.8));
    readings.insert("wavemeter".to_string(), json!(446.8));
    let result = client
        .attach_instrument_readout(RunId::from(8), &readings)
        .await;

    get.assert_async().await;
    put.assert_async().await;
    assert!(matches!(
        result,
        Err(RunUpdateError::InvalidInstrumentKey(key)) if key == "wavemeter"
    ));
}
