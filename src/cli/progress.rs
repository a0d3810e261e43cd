//! Spinner and result printing for the terminal front end.

use console::{StyledObject, style};
use indicatif::{ProgressBar, ProgressStyle};

use crate::render::{
    BallColor, BallView, CardView, ExampleView, FrequencyView, ModelSectionView, StatsView,
};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Creates the spinner shown while a prediction runs.
pub fn make_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message("Running AI prediction...");
    spinner
}

fn ball(ball: &BallView) -> StyledObject<String> {
    let text = format!("{:>2}", ball.number);
    let styled = match ball.color {
        BallColor::Yellow => style(text).yellow(),
        BallColor::Blue => style(text).blue(),
        BallColor::Red => style(text).red(),
        BallColor::Gray => style(text).dim(),
        BallColor::Green => style(text).green(),
    };
    if ball.user_selected {
        styled.bold().underlined()
    } else {
        styled
    }
}

fn balls(balls: &[BallView]) -> String {
    balls
        .iter()
        .map(|b| ball(b).to_string())
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn print_results_header() {
    println!("\n{SEPARATOR}");
    println!("{}", style("AI Recommendations").bold());
    println!("{SEPARATOR}");
}

pub fn print_card(card: &CardView) {
    let label = if card.top_pick {
        style(format!("{:>6}", card.label)).magenta().bold()
    } else {
        style(format!("{:>6}", card.label)).dim()
    };
    let legend = if card.show_legend {
        format!("  {}", style("(underlined: your numbers)").dim())
    } else {
        String::new()
    };
    println!("  {label}  {}{legend}", balls(&card.balls));
}

pub fn print_section(section: &ModelSectionView) {
    println!(
        "\n  {} {}",
        style(&section.name).cyan().bold(),
        style(format!("({} combinations)", section.total_combinations)).dim()
    );
    if !section.description.is_empty() {
        println!("  {}", section.description);
    }
    for card in &section.cards {
        print_card(card);
    }
}

pub fn print_examples(examples: &ExampleView) {
    let source = if examples.local {
        " (generated locally)".to_string()
    } else {
        examples
            .data_source
            .as_deref()
            .map(|s| format!(" ({s})"))
            .unwrap_or_default()
    };
    println!("Example numbers{source}:  {}", balls(&examples.balls));
    println!(
        "  sum {}, {} even / {} odd",
        examples.sum, examples.even_count, examples.odd_count
    );
}

fn frequency_line(entries: &[FrequencyView]) -> String {
    entries
        .iter()
        .map(|f| format!("{}×{}", f.number, f.frequency))
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn print_stats(stats: &StatsView) {
    println!("\n{SEPARATOR}");
    println!("{}  {}", style("Hot ").red().bold(), frequency_line(&stats.hot));
    println!("{}  {}", style("Cold").blue().bold(), frequency_line(&stats.cold));
    println!("{SEPARATOR}");
}
