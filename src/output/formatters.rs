use anyhow::Result;

use crate::transcribe::TranscriptionResult;

/// Format as plain text, optionally one timed line per segment
pub fn format_as_text(result: &TranscriptionResult, include_timestamps: bool) -> String {
    if !include_timestamps || result.segments.is_empty() {
        return result.transcript.clone();
    }

    result
        .segments
        .iter()
        .map(|segment| {
            format!(
                "[{} --> {}] {}",
                format_timestamp_brief(segment.start_time),
                format_timestamp_brief(segment.end_time),
                segment.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format as JSON with segments and metadata
pub fn format_as_json(result: &TranscriptionResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Format as SRT subtitles
pub fn format_as_srt(result: &TranscriptionResult) -> String {
    let mut output = String::new();

    for (index, segment) in result.segments.iter().enumerate() {
        output.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_timestamp_srt(segment.start_time),
            format_timestamp_srt(segment.end_time),
            segment.text
        ));
    }

    output
}

/// Format as WebVTT
pub fn format_as_vtt(result: &TranscriptionResult) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for segment in &result.segments {
        output.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_timestamp_vtt(segment.start_time),
            format_timestamp_vtt(segment.end_time),
            segment.text
        ));
    }

    output
}

/// "mm:ss.mmm" for inline text output
fn format_timestamp_brief(seconds: f64) -> String {
    let total_millis = (seconds * 1000.0).round() as u64;
    let minutes = total_millis / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{:02}:{:02}.{:03}", minutes, secs, millis)
}

/// "HH:MM:SS,mmm" as SRT requires
fn format_timestamp_srt(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_timestamp(seconds);
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// "HH:MM:SS.mmm" as WebVTT requires
fn format_timestamp_vtt(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_timestamp(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

fn split_timestamp(seconds: f64) -> (u64, u64, u64, u64) {
    let total_millis = (seconds * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    (hours, minutes, secs, millis)
}
