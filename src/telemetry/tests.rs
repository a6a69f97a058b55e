use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use super::{TelemetryKind, build_collectors, parse_reading};

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: std::future::Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

#[test]
fn hioki_reading_takes_labelled_third_field() -> Result<(), String> {
    let dialect = TelemetryKind::Hioki.dialect();
    let watts = parse_reading(&dialect, "U 230.1;I 0.52;P +1.2050E+02")
        .map_err(|err| err.to_string())?;
    if (watts - 120.5).abs() > 1e-9 {
        return Err(format!("Unexpected watts: {}", watts));
    }
    Ok(())
}

#[test]
fn tmctld_reading_takes_third_comma_field() -> Result<(), String> {
    let dialect = TelemetryKind::Tmctld.dialect();
    let watts = parse_reading(&dialect, "ok,1,87.25").map_err(|err| err.to_string())?;
    if (watts - 87.25).abs() > 1e-9 {
        return Err(format!("Unexpected watts: {}", watts));
    }
    if parse_reading(&dialect, "ok,1").is_ok() {
        return Err("Expected missing field error".to_owned());
    }
    Ok(())
}

#[test]
fn collectors_need_kind_and_address() -> Result<(), String> {
    let without_kind = build_collectors(None, &["10.0.0.1".to_owned()])?;
    let without_address = build_collectors(Some(TelemetryKind::Hioki), &[" ".to_owned()])?;
    if !without_kind.is_empty() || !without_address.is_empty() {
        return Err("Expected no collectors".to_owned());
    }

    let collectors = build_collectors(
        Some(TelemetryKind::Hioki),
        &["10.0.0.1".to_owned(), "10.0.0.2:4000".to_owned()],
    )?;
    let names: Vec<&str> = collectors.iter().map(|collector| collector.name()).collect();
    if names != ["10.0.0.1:3300", "10.0.0.2:4000"] {
        return Err(format!("Unexpected collector names: {:?}", names));
    }
    Ok(())
}

#[test]
fn collector_averages_polled_readings() -> Result<(), String> {
    run_async_test(async {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|err| format!("bind failed: {}", err))?;
        let port = listener
            .local_addr()
            .map_err(|err| format!("local_addr failed: {}", err))?
            .port();

        let meter = tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            let mut query = Vec::new();
            while let Ok(bytes) = reader.read_until(b'\n', &mut query).await {
                if bytes == 0 || write_half.write_all(b"ok,1,50.0\n").await.is_err() {
                    break;
                }
                query.clear();
            }
        });

        let mut collector = TelemetryKind::Tmctld.collector("127.0.0.1", port);
        collector.start().await?;
        tokio::time::sleep(Duration::from_millis(450)).await;
        collector.stop().await;
        meter.abort();
        let watts = collector.sample();

        if (watts - 50.0).abs() > 1e-9 {
            return Err(format!("Unexpected average: {}", watts));
        }
        if collector.sample().abs() > f64::EPSILON {
            return Err("Sample should reset the readings".to_owned());
        }
        Ok(())
    })
}
