use crate::api::{
    HydrationError, MeetingSummary, ResultSource, ResultsPayload, TranscriptSegment, UniqueSlide,
};
use crate::options::ProcessingOptions;
use serde::Serialize;

/// Final assembled result set for one job.
///
/// A section is present only when it was requested at submission time and
/// the backend produced it. Requested-but-missing sections are simply
/// absent; the flags express intent to display, not a delivery guarantee.
#[derive(Debug, Clone, Serialize)]
pub struct ResultSet {
    pub job_id: String,
    pub summary: Option<MeetingSummary>,
    pub slides: Option<Vec<UniqueSlide>>,
    pub transcript: Option<Vec<TranscriptSegment>>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.slides.is_none() && self.transcript.is_none()
    }
}

/// Fetches the result payload once and filters it against the submitted
/// options. Sections the backend sent but the caller never asked for are
/// dropped here, whatever the payload says.
pub async fn hydrate<S>(
    source: &S,
    job_id: &str,
    options: &ProcessingOptions,
) -> Result<ResultSet, HydrationError>
where
    S: ResultSource + ?Sized,
{
    let payload = source.fetch_results(job_id).await?;
    Ok(assemble(job_id, payload, options))
}

pub(crate) fn assemble(
    job_id: &str,
    payload: ResultsPayload,
    options: &ProcessingOptions,
) -> ResultSet {
    let summary = if options.enable_summarization {
        payload.summary
    } else {
        if payload.summary.is_some() {
            tracing::debug!("Job {}: dropping unrequested summary section", job_id);
        }
        None
    };

    let slides = if options.return_slides {
        payload.slides.map(|slides| {
            if options.enable_slide_summaries {
                slides
            } else {
                slides
                    .into_iter()
                    .map(|mut slide| {
                        slide.discussion_summary = None;
                        slide
                    })
                    .collect()
            }
        })
    } else {
        if payload.slides.is_some() {
            tracing::debug!("Job {}: dropping unrequested slides section", job_id);
        }
        None
    };

    let transcript = if options.return_transcript {
        payload.transcript
    } else {
        if payload.transcript.is_some() {
            tracing::debug!("Job {}: dropping unrequested transcript section", job_id);
        }
        None
    };

    ResultSet {
        job_id: job_id.to_string(),
        summary,
        slides,
        transcript,
    }
}
