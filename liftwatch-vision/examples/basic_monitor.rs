//! Basic example of driving the realtime monitor from the command line

use liftwatch_vision::{MonitorConfig, MonitorService};
use std::path::PathBuf;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let video = args.next().unwrap_or_else(|| "./video/elevator.mp4".to_string());
    let model = args.next().unwrap_or_else(|| "./models/best.onnx".to_string());

    let config = MonitorConfig {
        video_path: PathBuf::from(video),
        model_path: PathBuf::from(model),
        ..MonitorConfig::default()
    };

    let service = MonitorService::from_config(config)?;
    let started = service.start_realtime(Some("1F".to_string()))?;
    println!(
        "Realtime analysis started: {} frames at {:.1} fps (floor {})",
        started.total_frames, started.fps, started.floor
    );

    // Poll a little faster than the frame interval, the way a browser
    // client would.
    let interval = Duration::from_secs_f64(1.0 / (started.fps * 1.5));
    loop {
        let result = service.poll_frame()?;
        if result.completed {
            if let Some(perf) = result.performance {
                println!(
                    "Completed: {} frames in {:.2}s ({:.1} fps average)",
                    perf.frames_processed, perf.elapsed_secs, perf.average_fps
                );
            }
            break;
        }
        print!("\rprogress: {:>3}%", result.progress);
        tokio::time::sleep(interval).await;
    }
    println!();

    for event in service.events() {
        println!(
            "[{}] {} ({:.2}) floor {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.label,
            event.confidence,
            event.floor
        );
    }

    Ok(())
}
