//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use givlog_core::{Donation, DonationBook, Organization, StorageState};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single organization
    pub fn print_organization(&self, org: &Organization) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", org.id);
                println!("Name:     {}", org.name);
                if let Some(ref category) = org.category {
                    println!("Category: {}", category);
                }
                if let Some(ref website) = org.website {
                    println!("Website:  {}", website);
                }
                println!("Added:    {}", org.created_at.format("%Y-%m-%d"));
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(org).unwrap());
            }
            OutputFormat::Quiet => {
                println!("{}", org.id);
            }
        }
    }

    /// Print a list of organizations
    pub fn print_organizations(&self, orgs: &[Organization]) {
        match self.format {
            OutputFormat::Human => {
                if orgs.is_empty() {
                    println!("No organizations found.");
                    return;
                }
                for org in orgs {
                    let category = org.category.as_deref().unwrap_or("-");
                    println!(
                        "{} | {} | {}",
                        &org.id.to_string()[..8],
                        truncate(&org.name, 35),
                        category
                    );
                }
                println!("\n{} organization(s)", orgs.len());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(orgs).unwrap());
            }
            OutputFormat::Quiet => {
                for org in orgs {
                    println!("{}", org.id);
                }
            }
        }
    }

    /// Print a list of donations, resolving organization names from the book
    pub fn print_donations(&self, book: &DonationBook, donations: &[&Donation]) {
        match self.format {
            OutputFormat::Human => {
                if donations.is_empty() {
                    println!("No donations found.");
                    return;
                }
                for donation in donations {
                    let org_name = book
                        .organization(donation.organization_id)
                        .map(|o| o.name.as_str())
                        .unwrap_or("(unknown)");
                    println!(
                        "{} | {} | {} {} | {}",
                        donation.date.format("%Y-%m-%d"),
                        truncate(org_name, 30),
                        format_amount(donation.amount_cents),
                        donation.currency,
                        donation.note.as_deref().unwrap_or("")
                    );
                }
                let total: i64 = donations.iter().map(|d| d.amount_cents).sum();
                println!("\n{} donation(s), total {}", donations.len(), format_amount(total));
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(donations).unwrap());
            }
            OutputFormat::Quiet => {
                for donation in donations {
                    println!("{}", donation.id);
                }
            }
        }
    }

    /// Print the sync state of the store plus a summary of the document
    pub fn print_status(&self, remote: &str, state: &StorageState<DonationBook>) {
        let book = state.data.data();
        match self.format {
            OutputFormat::Human => {
                println!("Remote:        {}", remote);
                println!("Data:          {}", state.data.label());
                println!("Status:        {}", state.status.label());
                println!("Organizations: {}", book.organizations.len());
                println!(
                    "Donations:     {} (total {})",
                    book.donations.len(),
                    format_amount(book.total_cents())
                );
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "remote": remote,
                        "data": state.data.label(),
                        "status": state.status.label(),
                        "organizations": book.organizations.len(),
                        "donations": book.donations.len(),
                        "total_cents": book.total_cents(),
                    })
                );
            }
            OutputFormat::Quiet => {
                println!("{}", state.status.label());
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Format an amount in cents as a decimal string
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, (cents / 100).abs(), (cents % 100).abs())
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
    }

    #[test]
    fn test_truncate_cuts_on_char_boundaries() {
        // A cut point landing inside a multibyte character must not panic
        let name = format!("{}é charity club", "a".repeat(31));
        let out = truncate(&name, 35);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 35);

        // Multibyte content within the limit passes through untouched
        assert_eq!(truncate("caffè", 5), "caffè");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0.00");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(1250), "12.50");
        assert_eq!(format_amount(100000), "1000.00");
    }

    #[test]
    fn test_format_amount_negative() {
        assert_eq!(format_amount(-5), "-0.05");
        assert_eq!(format_amount(-1250), "-12.50");
    }
}
