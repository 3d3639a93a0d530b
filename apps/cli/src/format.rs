use std::{path::Path, time::Duration};

use vidbrief_core::SummaryResult;

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// Render a pipeline result as markdown for the terminal.
///
/// Key frames are listed with their full path under `frame_dir`.
pub fn format_summary_readable(result: &SummaryResult, frame_dir: &Path) -> String {
    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", result.filename));
    output.push_str(&format!(
        "**Audio:** {} | **Key frames:** {}\n\n",
        if result.has_audio { "yes" } else { "no" },
        result.key_frames.len()
    ));

    output.push_str("## Summary\n\n");
    output.push_str(&result.summary);
    output.push_str("\n\n");

    output.push_str("## Transcription\n\n");
    output.push_str(&result.transcription);
    output.push_str("\n\n");

    if !result.key_frames.is_empty() {
        output.push_str("## Key frames\n\n");
        for frame in &result.key_frames {
            output.push_str(&format!("• {}\n", frame_dir.join(frame).display()));
        }
        output.push('\n');
    }

    output
}
