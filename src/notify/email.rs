use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use crate::ingest::RunReport;
use crate::storage::OutputFormat;

/// Records listed inline; the attachment carries the rest.
pub const BODY_RECORD_LIMIT: usize = 20;

pub fn report_subject(report: &RunReport, date: NaiveDate) -> String {
    format!(
        "Job report - {} - {} kept / {} fetched",
        date.format("%Y-%m-%d"),
        report.kept(),
        report.fetched
    )
}

pub fn report_body(report: &RunReport) -> String {
    let mut body = format!(
        "Fetched: {}\nKept: {}\nFiltered out: {}\nDuplicates: {}\nEnrichment failures: {}\n",
        report.fetched,
        report.kept(),
        report.filtered_out,
        report.duplicates,
        report.enrichment_failures
    );

    if !report.source_failures.is_empty() {
        body.push_str("\nFailed sources:\n");
        for f in &report.source_failures {
            body.push_str(&format!("  - {}: {}\n", f.source, f.error));
        }
    }

    if report.records.is_empty() {
        body.push_str("\nNo matching postings this run.\n");
        return body;
    }

    body.push_str("\nLatest postings:\n");
    for (i, r) in report.records.iter().take(BODY_RECORD_LIMIT).enumerate() {
        let date = r
            .posted_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown date".into());
        body.push_str(&format!(
            "{:>2}. {} | {} | {} | {}\n    {}\n",
            i + 1,
            r.title,
            r.company.as_deref().unwrap_or("-"),
            r.location.as_deref().unwrap_or("-"),
            date,
            r.url
        ));
    }
    if report.kept() > BODY_RECORD_LIMIT {
        body.push_str(&format!(
            "\n...and {} more in the attached file.\n",
            report.kept() - BODY_RECORD_LIMIT
        ));
    }
    body
}

/// Comma separated; blanks skipped; at least one address required.
pub fn parse_recipients(raw: &str) -> Result<Vec<Mailbox>> {
    let list: Vec<Mailbox> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Mailbox>().with_context(|| format!("invalid recipient `{s}`")))
        .collect::<Result<_>>()?;
    if list.is_empty() {
        return Err(anyhow!("REPORT_RECIPIENTS is empty"));
    }
    Ok(list)
}

pub struct EmailReporter {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailReporter {
    pub fn from_env() -> Result<Self> {
        let var = |k: &str| std::env::var(k).with_context(|| format!("{k} missing"));
        let host = var("SMTP_HOST")?;
        let user = var("SMTP_USER")?;
        let pass = var("SMTP_PASS")?;
        let from_addr = var("REPORT_FROM").unwrap_or_else(|_| user.clone());
        let to = parse_recipients(&var("REPORT_RECIPIENTS")?)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(Credentials::new(user, pass))
            .build();
        let from = from_addr.parse().context("invalid REPORT_FROM")?;

        Ok(Self { mailer, from, to })
    }

    /// Send the run summary, attaching the output file when it can be read.
    pub async fn send_report(
        &self,
        report: &RunReport,
        date: NaiveDate,
        output: Option<(&Path, OutputFormat)>,
    ) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(report_subject(report, date));
        for to in &self.to {
            builder = builder.to(to.clone());
        }

        let text = SinglePart::plain(report_body(report));
        let msg = match output.and_then(|(p, f)| attachment(p, f)) {
            Some(att) => builder.multipart(MultiPart::mixed().singlepart(text).singlepart(att)),
            None => builder.singlepart(text),
        }
        .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        tracing::info!(target: "notify", recipients = self.to.len(), "report emailed");
        Ok(())
    }
}

fn attachment(path: &Path, format: OutputFormat) -> Option<SinglePart> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(target: "notify", path = %path.display(), error = %e, "attachment skipped");
            return None;
        }
    };
    let mime = match format {
        OutputFormat::Json => "application/json",
        OutputFormat::Csv => "text/csv",
    };
    let content_type = ContentType::parse(mime).ok()?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("jobs.{format}"));
    Some(Attachment::new(filename).body(bytes, content_type))
}
