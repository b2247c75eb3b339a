use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use engine::{RawEntryForm, RawFilter};

#[derive(Parser, Debug)]
#[command(name = "tenant_ledger")]
#[command(about = "Rental income and expense ledger")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Override log level (e.g. debug).
    #[arg(long, global = true)]
    pub level: Option<String>,
    /// `memory` or a SQLite file path.
    #[arg(long, global = true)]
    pub database: Option<String>,
    /// Owner id to sign in as.
    #[arg(long, global = true, env = "TENANT_LEDGER_USER")]
    pub user: Option<String>,
    /// Directory CSV exports are written to.
    #[arg(long, global = true)]
    pub export_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a new entry.
    Add(AddArgs),
    /// Print entries, newest first.
    List(ListArgs),
    /// Change some fields of an entry.
    Update(UpdateArgs),
    /// Delete one entry.
    Delete {
        id: String,
    },
    /// Delete several entries at once.
    BulkDelete {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },
    /// Totals by category and tenant.
    Summary(SummaryArgs),
    /// Write matching entries to a CSV file.
    Export(FilterArgs),
    /// Write a printable HTML report of matching entries.
    Report(ReportArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(long)]
    pub tenant: String,
    #[arg(long)]
    pub amount: String,
    /// Rent, Maintenance, Security Deposit, Utilities or Other.
    #[arg(long)]
    pub category: String,
    /// yyyy-MM-dd; defaults to today.
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long, default_value = "")]
    pub description: String,
}

impl AddArgs {
    pub fn form(&self) -> RawEntryForm {
        RawEntryForm {
            tenant: self.tenant.clone(),
            amount: self.amount.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
            date: self
                .date
                .clone()
                .unwrap_or_else(|| Utc::now().date_naive().format("%Y-%m-%d").to_string()),
        }
    }
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub id: String,
    #[arg(long)]
    pub tenant: Option<String>,
    #[arg(long)]
    pub amount: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Inclusive lower date bound (yyyy-MM-dd).
    #[arg(long)]
    pub from: Option<String>,
    /// Inclusive upper date bound (yyyy-MM-dd).
    #[arg(long)]
    pub to: Option<String>,
    /// Exact tenant name.
    #[arg(long)]
    pub tenant: Option<String>,
    /// Repeat to allow several categories.
    #[arg(long = "category")]
    pub categories: Vec<String>,
    #[arg(long)]
    pub min: Option<String>,
    #[arg(long)]
    pub max: Option<String>,
    /// Case-insensitive text in tenant or description.
    #[arg(long)]
    pub search: Option<String>,
}

impl FilterArgs {
    pub fn raw(&self) -> RawFilter {
        RawFilter {
            date_from: self.from.clone(),
            date_to: self.to.clone(),
            tenant: self.tenant.clone(),
            categories: self.categories.clone(),
            amount_min: self.min.clone(),
            amount_max: self.max.clone(),
            search_term: self.search.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Read one page of this size straight from the database.
    #[arg(long)]
    pub limit: Option<u64>,
    /// Continue after a previous page.
    #[arg(long, requires = "limit")]
    pub cursor: Option<String>,
    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
    /// How many tenants to rank.
    #[arg(long, default_value_t = 5)]
    pub top: usize,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
    #[arg(long, default_value = engine::DEFAULT_REPORT_TITLE)]
    pub title: String,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn repeated_category_flags() {
        let cli = Cli::try_parse_from([
            "tenant_ledger",
            "list",
            "--category",
            "Rent",
            "--category",
            "Security Deposit",
            "--user",
            "alice",
        ])
        .unwrap();
        let Command::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.filter.categories, vec!["Rent", "Security Deposit"]);
        assert_eq!(cli.global.user.as_deref(), Some("alice"));
    }

    #[test]
    fn report_title_defaults() {
        let cli = Cli::try_parse_from(["tenant_ledger", "report", "--from", "2025-01-01"]).unwrap();
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.title, "Tenant Ledger Report");
        assert_eq!(args.filter.from.as_deref(), Some("2025-01-01"));
    }

    #[test]
    fn bulk_delete_needs_ids() {
        assert!(Cli::try_parse_from(["tenant_ledger", "bulk-delete"]).is_err());
    }
}
