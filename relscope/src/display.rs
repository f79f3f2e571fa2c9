//! Terminal rendering for reports, history and timelines.

use chrono::Local;
use relscope_core::timeline::{merge_valid, TimelineItem};
use relscope_core::{AnalysisMode, AnalysisReport, FlagType, PersonAnalysis};

const WIDTH: usize = 60;
const TLDR_PREVIEW_CHARS: usize = 60;

pub fn print_report(report: &AnalysisReport) {
    let meta = &report.meta;
    let body = &report.body;
    let deep = report.mode() == AnalysisMode::Deep;

    // Header
    println!();
    println!("╭{}╮", "─".repeat(WIDTH));
    println!("│{:^WIDTH$}│", "RELATIONSCOPE REPORT");
    println!("╰{}╯", "─".repeat(WIDTH));
    println!(
        "   {} · {} analysis · {}",
        meta.file_name,
        report.mode().display_name(),
        meta.analysis_date
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
    );
    println!(
        "   Period: {} → {}   Id: {}",
        meta.first_message_date, meta.last_message_date, meta.id
    );
    println!();

    if body.safety_warning.is_triggered {
        println!("⚠️  SAFETY NOTICE");
        println!("   {}", body.safety_warning.details);
        for resource in &body.safety_warning.resources {
            println!("   • {}: {}", resource.name, resource.contact);
        }
        println!();
    }

    println!("🔎 VERDICT");
    println!(
        "   {} ({}% confidence)",
        body.verdict.text, body.verdict.confidence
    );
    println!("   {}", body.tldr);
    println!();

    if !body.final_snapshot.is_empty() {
        println!("📊 SNAPSHOT");
        for meter in &body.final_snapshot {
            println!(
                "   {} {:<22} {} {:>3}%",
                meter.emoji,
                meter.name,
                meter_bar(meter.value),
                meter.value
            );
        }
        println!();
    }

    if !body.general_metrics.is_empty() {
        println!("📈 KEY METRICS");
        for metric in &body.general_metrics {
            println!("   {}: {}", metric.name, metric.value);
            println!("      {}", metric.insight);
        }
        println!();
    }

    if deep {
        println!("🧠 PERSONALITY");
        print_person(&body.person_a_analysis);
        print_person(&body.person_b_analysis);
    }

    let viz = &body.visualizations;
    println!("💬 COMMUNICATION");
    println!(
        "   Morning: {}  Afternoon: {}  Evening: {}  Night: {}",
        viz.time_of_day.morning,
        viz.time_of_day.afternoon,
        viz.time_of_day.evening,
        viz.time_of_day.night
    );
    println!(
        "   Night texting: {:.0}%",
        viz.time_of_day.night_percentage()
    );
    println!(
        "   Initiations: {} {} / {} {}",
        body.person_a_analysis.name,
        viz.reciprocity.person_a_initiations,
        body.person_b_analysis.name,
        viz.reciprocity.person_b_initiations
    );
    println!(
        "   Avg. response: {} {} min / {} {} min",
        body.person_a_analysis.name,
        viz.reciprocity.person_a_response_speed_minutes,
        body.person_b_analysis.name,
        viz.reciprocity.person_b_response_speed_minutes
    );
    println!();

    println!("🚩 FLAGS");
    for kind in FlagType::ALL {
        println!("   {} {}", kind.emoji(), kind.as_str());
        let mut any = false;
        for flag in body.flags_of(kind) {
            any = true;
            println!("      • {}", flag.description);
            if let Some(quote) = flag.evidence.first() {
                println!("        \"{}\"", quote);
            }
        }
        if !any {
            println!("      No {} flags identified.", kind.as_str());
        }
    }
    println!();

    if deep && body.has_fixing_kit() {
        println!("🧰 FIXING KIT");
        for group in &body.fixing_kit {
            println!("   {}", group.category);
            for item in &group.items {
                println!("      • {}", item);
            }
        }
        for topic in &body.discussion_topics {
            println!(
                "   Discuss ({}): {} - {}",
                topic.when.as_str(),
                topic.topic,
                topic.reason
            );
        }
        println!();
    }

    println!("🗓  TIMELINE");
    print_timeline_items(report);
    println!();

    if !body.gift_and_date_ideas.is_empty() {
        println!("🎁 GIFT & DATE IDEAS");
        for idea in &body.gift_and_date_ideas {
            println!("   • {}", idea);
        }
        println!();
    }
}

fn print_person(person: &PersonAnalysis) {
    println!("   {}", person.name);
    for (name, score) in person.ocean_score.traits() {
        println!("      {:<18} {} {:>3}", name, meter_bar(score), score);
    }
    let style = &person.messaging_style;
    println!("      Directness: {}", style.directness);
    println!("      Role: {}", style.role_flavor);
    println!("      Boundaries: {}", style.boundary_clarity);
    println!();
}

pub fn print_history(reports: &[AnalysisReport]) {
    if reports.is_empty() {
        println!("No history yet. Run `relscope analyze <FILE>` to create a report.");
        return;
    }

    println!(
        "{:<17} {:<6} {:<30} {}",
        "DATE", "MODE", "ID", "SUMMARY"
    );
    for report in reports {
        println!(
            "{:<17} {:<6} {:<30} {}",
            report
                .meta
                .analysis_date
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M"),
            report.mode().as_str(),
            report.meta.id,
            preview(&report.body.tldr, TLDR_PREVIEW_CHARS)
        );
    }
}

pub fn print_timeline(report: &AnalysisReport) {
    println!("Timeline for {} ({})", report.meta.id, report.meta.file_name);
    println!();
    print_timeline_items(report);
}

fn print_timeline_items(report: &AnalysisReport) {
    let viz = &report.body.visualizations;
    let merged = merge_valid(&viz.visual_timeline_events, &viz.visual_timeline_phases);

    if merged.items.is_empty() {
        println!("   Not enough data to generate a timeline.");
    }
    for item in &merged.items {
        match item {
            TimelineItem::Event { event, .. } => {
                println!("   {} {}  {}", event.kind.emoji(), event.date, event.description);
                if !event.inference.is_empty() {
                    println!("                  {}", event.inference);
                }
            }
            TimelineItem::Phase { phase, .. } => {
                let note = if phase.is_inverted() { "  (dates inverted)" } else { "" };
                println!(
                    "   ▌ {} → {}  {}{}",
                    phase.start_date, phase.end_date, phase.name, note
                );
            }
        }
    }
    if !merged.rejected.is_empty() {
        println!();
        println!("   Entries with unreadable dates:");
        for rejected in &merged.rejected {
            println!(
                "      {} #{}: {:?}",
                rejected.kind, rejected.index, rejected.value
            );
        }
    }
}

fn meter_bar(value: u32) -> String {
    let filled = (value.min(100) / 10) as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}
