//! 対話式レビューコンソール
//!
//! 署名一覧 → 照合候補の表示 → 確定/該当なし/編集 を端末上で行う。
//! 状態はすべて `ReviewSession` が持ち、ここでは表示と入力だけを扱う。

use crate::error::Result;
use crate::gateway::MatchingGateway;
use crate::session::{
    Confirmation, Decision, DocumentOutcome, EntryId, ReviewSession, SessionEvent, SignatureEntry,
};
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use sig_review_common::{CandidateMatch, MatchMethod, MatchResultSet, ReviewStatus, SignatureRecord};
use std::fmt::Write as _;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// 一覧画面の操作
enum MainAction {
    Entry(EntryId),
    Reprocess,
    Summary,
    Quit,
}

/// エントリ画面の操作
#[derive(Clone, Copy)]
enum EntryAction {
    LoadDetails,
    SelectCandidate,
    Edit,
    NoMatch,
    Back,
}

const ENTRY_ACTIONS: [(EntryAction, &str); 5] = [
    (EntryAction::LoadDetails, "Load details"),
    (EntryAction::SelectCandidate, "Select candidate"),
    (EntryAction::Edit, "Edit"),
    (EntryAction::NoMatch, "No match"),
    (EntryAction::Back, "Back"),
];

pub fn status_badge(status: ReviewStatus) -> &'static str {
    match status {
        ReviewStatus::Default => "[ ]",
        ReviewStatus::Matched => "[✔]",
        ReviewStatus::NoMatch => "[✘]",
    }
}

/// 一覧の1行
pub fn entry_label(index: usize, entry: &SignatureEntry) -> String {
    format!(
        "{} Signature {}  Line: {}  Date: {}  Name: {}",
        status_badge(entry.status),
        index + 1,
        entry.record.signature_line,
        entry.record.date,
        entry.record.full_name()
    )
}

/// 候補選択リストの1行
pub fn candidate_label(index: usize, candidate: &CandidateMatch) -> String {
    let mut label = format!(
        "{:<22} #{} {}  {}",
        candidate.method.label(),
        index + 1,
        candidate.full_name(),
        candidate.address()
    );
    if let Some(party) = candidate.party() {
        let _ = write!(label, "  {}", party);
    }
    if let Some(score) = candidate.score() {
        let _ = write!(label, "  ({:.1})", score);
    }
    label
}

/// 方法別の照合結果テーブル
pub fn render_details(signature_line: &str, results: &MatchResultSet) -> String {
    let mut out = format!("Voter matches for signature line {}\n", signature_line);
    for method in MatchMethod::ALL {
        let _ = writeln!(out, "\n{}", method.label());
        let matches = results.matches(method);
        if matches.is_empty() {
            out.push_str("  No matches found.\n");
            continue;
        }
        let _ = writeln!(out, "  {:>3}  {:<28} {:<28} Extra", "#", "Name", "Address");
        for (idx, candidate) in matches.iter().enumerate() {
            let extra = [
                candidate.party().unwrap_or_default().to_string(),
                candidate.score().map(|s| format!("{:.1}", s)).unwrap_or_default(),
            ]
            .join(" ");
            let _ = writeln!(
                out,
                "  {:>3}  {:<28} {:<28} {}",
                idx + 1,
                candidate.full_name(),
                candidate.address(),
                extra.trim()
            );
        }
    }
    out
}

/// 通知（トースト相当）の文言。表示不要なイベントは `None`
pub fn notification(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::DocumentLoaded { filename, entries } => {
            Some(format!("✔ {}: {} signatures extracted", filename, entries.len()))
        }
        SessionEvent::NoSignatures { filename } => Some(format!("{}: no signatures extracted", filename)),
        SessionEvent::StatusChanged {
            signature_line,
            status,
            ..
        } => Some(format!("Line {} → {}", signature_line, status)),
        SessionEvent::RecordEdited { record, .. } => {
            Some(format!("Line {} updated", record.signature_line))
        }
        SessionEvent::OperationFailed { kind, message } => Some(format!("⚠ {} error: {}", kind, message)),
        SessionEvent::DetailsLoaded { .. } | SessionEvent::DocumentClosed => None,
    }
}

fn show_notifications(events: &mut UnboundedReceiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        if let Some(message) = notification(&event) {
            println!("{}", message);
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn confirm(prompt: &str) -> Result<Confirmation> {
    let answer = Confirm::new().with_prompt(prompt).default(false).interact()?;
    Ok(Confirmation::from(answer))
}

/// 文書を開いて対話レビューを行う
pub async fn run_review<G: MatchingGateway>(session: &ReviewSession<G>, filename: &str) -> Result<()> {
    let mut events = session.subscribe();

    let bar = spinner(&format!("Processing {}...", filename));
    let opened = session.open_document(filename).await;
    bar.finish_and_clear();
    show_notifications(&mut events);

    if let Ok(DocumentOutcome::NoSignatures) | Err(_) = opened {
        if confirm("Re-run extraction?")? == Confirmation::Declined {
            return Ok(());
        }
        reprocess(session, &mut events).await;
    }

    loop {
        match prompt_main(session)? {
            MainAction::Entry(id) => entry_menu(session, id, &mut events).await?,
            MainAction::Reprocess => {
                let answer = confirm("Re-run inferences for this document? This will reprocess the image.")?;
                if answer == Confirmation::Confirmed {
                    reprocess(session, &mut events).await;
                }
            }
            MainAction::Summary => println!("{}", session.summary()),
            MainAction::Quit => break,
        }
        show_notifications(&mut events);
    }

    println!("{}", session.summary());
    session.close_document();
    Ok(())
}

async fn reprocess<G: MatchingGateway>(
    session: &ReviewSession<G>,
    events: &mut UnboundedReceiver<SessionEvent>,
) {
    let bar = spinner("Reprocessing...");
    let _ = session.reprocess(Confirmation::Confirmed).await;
    bar.finish_and_clear();
    show_notifications(events);
}

fn prompt_main<G: MatchingGateway>(session: &ReviewSession<G>) -> Result<MainAction> {
    let entries = session.entries();
    let mut items: Vec<String> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| entry_label(i, e))
        .collect();
    items.push("Re-run extraction".into());
    items.push("Summary".into());
    items.push("Quit".into());

    let choice = Select::new()
        .with_prompt("Signatures")
        .items(&items)
        .default(0)
        .interact()?;

    Ok(match choice {
        i if i < entries.len() => MainAction::Entry(entries[i].id),
        i if i == entries.len() => MainAction::Reprocess,
        i if i == entries.len() + 1 => MainAction::Summary,
        _ => MainAction::Quit,
    })
}

async fn entry_menu<G: MatchingGateway>(
    session: &ReviewSession<G>,
    id: EntryId,
    events: &mut UnboundedReceiver<SessionEvent>,
) -> Result<()> {
    loop {
        let Some(entry) = session.entry(id) else {
            return Ok(());
        };
        let labels: Vec<&str> = ENTRY_ACTIONS.iter().map(|(_, label)| *label).collect();
        let choice = Select::new()
            .with_prompt(format!(
                "Line {} ({})",
                entry.record.signature_line, entry.status
            ))
            .items(&labels)
            .default(0)
            .interact()?;

        match ENTRY_ACTIONS[choice].0 {
            EntryAction::LoadDetails => {
                if let Some(results) = load_details(session, id).await {
                    println!("{}", render_details(&entry.record.signature_line, &results));
                }
            }
            EntryAction::SelectCandidate => select_candidate(session, id, events).await?,
            EntryAction::Edit => {
                let fields = prompt_edit(&entry.record)?;
                if session.edit_record(id, fields).is_ok()
                    && confirm("Re-run search with the edited values?")? == Confirmation::Confirmed
                {
                    if let (Some(results), Some(edited)) = (load_details(session, id).await, session.entry(id)) {
                        println!("{}", render_details(&edited.record.signature_line, &results));
                    }
                }
            }
            EntryAction::NoMatch => {
                let answer = confirm("Mark this signature as having no match?")?;
                if let Ok(Decision::Applied) = session.mark_no_match(id, answer) {
                    println!("No match selected for signature line {}.", entry.record.signature_line);
                }
            }
            EntryAction::Back => return Ok(()),
        }
        show_notifications(events);
    }
}

/// 照合結果を取得（キャッシュ判定はセッション側）
async fn load_details<G: MatchingGateway>(session: &ReviewSession<G>, id: EntryId) -> Option<MatchResultSet> {
    let bar = spinner("Loading details...");
    let results = session.fetch_details(id).await.ok();
    bar.finish_and_clear();
    results
}

async fn select_candidate<G: MatchingGateway>(
    session: &ReviewSession<G>,
    id: EntryId,
    events: &mut UnboundedReceiver<SessionEvent>,
) -> Result<()> {
    let Some(results) = load_details(session, id).await else {
        show_notifications(events);
        return Ok(());
    };
    if results.is_empty() {
        println!("No matches found.");
        return Ok(());
    }

    let candidates: Vec<&CandidateMatch> = results.iter().collect();
    let mut labels: Vec<String> = Vec::with_capacity(candidates.len() + 1);
    for method in MatchMethod::ALL {
        for (idx, candidate) in results.matches(method).iter().enumerate() {
            labels.push(candidate_label(idx, candidate));
        }
    }
    labels.push("Cancel".into());

    let choice = Select::new()
        .with_prompt("Select candidate")
        .items(&labels)
        .default(0)
        .interact()?;
    let Some(candidate) = candidates.get(choice) else {
        return Ok(());
    };

    let answer = confirm("Finalize selection of this candidate?")?;
    let bar = spinner("Finalizing...");
    let decision = session.finalize_candidate(id, candidate, answer).await;
    bar.finish_and_clear();
    if let Ok(Decision::Applied) = decision {
        println!("Candidate finalized!");
    }
    Ok(())
}

fn prompt_edit(record: &SignatureRecord) -> Result<SignatureRecord> {
    let text = |prompt: &str, initial: &str| -> Result<String> {
        let value: String = Input::new()
            .with_prompt(prompt)
            .with_initial_text(initial)
            .allow_empty(true)
            .interact_text()?;
        Ok(value)
    };

    Ok(SignatureRecord {
        signature_line: text("Signature Line", &record.signature_line)?,
        date: text("Date", &record.date)?,
        first_name: text("First Name", &record.first_name)?,
        last_name: text("Last Name", &record.last_name)?,
        address_number: Some(text(
            "Address Number",
            record.address_number.as_deref().unwrap_or_default(),
        )?),
        address_name: Some(text(
            "Address Name",
            record.address_name.as_deref().unwrap_or_default(),
        )?),
    })
}
