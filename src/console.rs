//! Interactive prompts. The console is this tool's whole user interface:
//! it collects the product URL, optional card prefill and execution
//! timing, and presents the menu for a schedule found at startup.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeDelta};

use crate::types::{ResolvedInputs, ScheduleRequest};

pub fn banner() {
    println!("{}", "=".repeat(60));
    println!("QUICKBUY - One-Click Purchase Automation");
    println!("{}", "=".repeat(60));
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading from stdin")?;
    Ok(line.trim().to_string())
}

/// Collect a full request interactively: product URL, optional card
/// prefill, execution timing.
pub fn collect_request() -> Result<ScheduleRequest> {
    println!("\nPlease enter the product URL.");
    println!("Pick color, size and variant on the product page first, then copy");
    println!("the URL - the automation buys exactly what the URL points at.\n");
    let target_url = prompt("Product URL: ")?;

    let mut inputs = ResolvedInputs {
        target_url,
        ..Default::default()
    };

    let prefill = prompt("\nPrefill card details? (y/n): ")?;
    if matches!(prefill.to_lowercase().as_str(), "y" | "yes") {
        inputs.card_number = prompt("Card Number: ")?;
        inputs.expiry = normalize_expiry(&prompt("Expiry Date (MM/YY): ")?);
        inputs.cvv = prompt("CVV: ")?;
    } else {
        println!("Card details will be entered manually during the run.");
    }

    println!("\nExecution timing:");
    println!("1. Execute now");
    println!("2. Schedule for later");
    let choice = prompt("Choose option (1 or 2): ")?;

    let scheduled_at = if choice == "2" {
        let date = prompt("Date (DD/MM/YYYY, empty for today): ")?;
        let time = prompt("Time (HH:MM, 24-hour): ")?;
        parse_schedule(&date, &time, Local::now())
    } else {
        None
    };

    Ok(ScheduleRequest {
        inputs,
        scheduled_at,
    })
}

/// The payment form renders expiry as "MM / YY"; accept plain MM/YY too.
pub fn normalize_expiry(raw: &str) -> String {
    if raw.len() == 5 && raw.as_bytes()[2] == b'/' {
        raw.replace('/', " / ")
    } else {
        raw.to_string()
    }
}

/// Turn the two console answers into a future timestamp. Anything
/// malformed or already past degrades to "execute now".
pub fn parse_schedule(date: &str, time: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let date = if date.is_empty() {
        now.date_naive()
    } else {
        match NaiveDate::parse_from_str(date, "%d/%m/%Y") {
            Ok(d) => d,
            Err(_) => {
                println!("Invalid date format, using today.");
                now.date_naive()
            }
        }
    };
    let time = match NaiveTime::parse_from_str(time, "%H:%M") {
        Ok(t) => t,
        Err(_) => {
            println!("Invalid time format, executing now.");
            return None;
        }
    };
    let at = date.and_time(time).and_local_timezone(Local).earliest()?;
    if at <= now {
        println!("Scheduled time is in the past, executing now instead.");
        None
    } else {
        Some(at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleChoice {
    Wait,
    RunNow,
    Cancel,
}

/// Show a stored schedule and ask what to do with it.
pub fn schedule_menu(request: &ScheduleRequest) -> Result<ScheduleChoice> {
    println!("\n{}", "=".repeat(60));
    println!("SCHEDULED EXECUTION FOUND");
    println!("{}", "=".repeat(60));
    match request.scheduled_at {
        Some(at) => {
            println!("Scheduled for: {}", at.format("%d/%m/%Y at %H:%M"));
            let remaining = at - Local::now();
            if remaining > TimeDelta::zero() {
                let secs = remaining.num_seconds();
                println!(
                    "Time remaining: {:02}:{:02}:{:02}",
                    secs / 3600,
                    (secs % 3600) / 60,
                    secs % 60
                );
            }
        }
        None => println!("Scheduled for: immediately"),
    }
    println!("Product: {}", request.inputs.target_url);
    println!(
        "Card prefill: {}",
        if request.inputs.card_number.is_empty() {
            "No"
        } else {
            "Yes"
        }
    );
    println!("\nOptions:");
    println!("1. Wait for scheduled time");
    println!("2. Execute now");
    println!("3. Cancel scheduled execution");

    Ok(match prompt("Choose option (1, 2, or 3): ")?.as_str() {
        "2" => ScheduleChoice::RunNow,
        "3" => ScheduleChoice::Cancel,
        _ => ScheduleChoice::Wait,
    })
}

/// Keep the browser alive until the user has finished up by hand.
pub fn hold_open() -> Result<()> {
    let _ = prompt("\nPress Enter to close the browser...")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_gets_the_spaced_site_format() {
        assert_eq!(normalize_expiry("03/34"), "03 / 34");
        assert_eq!(normalize_expiry("03 / 34"), "03 / 34");
        assert_eq!(normalize_expiry(""), "");
        assert_eq!(normalize_expiry("0334"), "0334");
    }

    #[test]
    fn schedule_parsing_accepts_a_future_time() {
        let now = Local::now();
        let tomorrow = now + TimeDelta::days(1);
        let at = parse_schedule(&tomorrow.format("%d/%m/%Y").to_string(), "09:30", now).unwrap();
        assert_eq!(at.date_naive(), tomorrow.date_naive());
        assert_eq!(at.format("%H:%M").to_string(), "09:30");
    }

    #[test]
    fn empty_date_means_today() {
        let now = Local::now();
        // Late enough today to still be in the future almost always; pin
        // the clock instead of relying on wall time.
        let now = now
            .date_naive()
            .and_hms_opt(8, 0, 0)
            .unwrap()
            .and_local_timezone(Local)
            .earliest()
            .unwrap();
        let at = parse_schedule("", "23:59", now).unwrap();
        assert_eq!(at.date_naive(), now.date_naive());
    }

    #[test]
    fn past_times_degrade_to_execute_now() {
        let now = Local::now();
        let yesterday = now - TimeDelta::days(1);
        assert_eq!(
            parse_schedule(&yesterday.format("%d/%m/%Y").to_string(), "09:30", now),
            None
        );
    }

    #[test]
    fn malformed_time_degrades_to_execute_now() {
        assert_eq!(parse_schedule("", "quarter past nine", Local::now()), None);
        assert_eq!(parse_schedule("", "", Local::now()), None);
    }

    #[test]
    fn malformed_date_falls_back_to_today() {
        let now = Local::now()
            .date_naive()
            .and_hms_opt(8, 0, 0)
            .unwrap()
            .and_local_timezone(Local)
            .earliest()
            .unwrap();
        let at = parse_schedule("32/13/2026", "23:59", now).unwrap();
        assert_eq!(at.date_naive(), now.date_naive());
    }
}
