use std::{collections::BTreeMap, fmt::Display};

use chrono::Utc;
use engine::{
    EngineError, Entry, EntryPatch, FilterField, FilterSpec, MutationCoordinator, PageRequest,
    RawEntryForm, SqlStore, SubmitError, export_to_dir, filter_entries, format_currency,
    group_by_month, parse_form_at, render_report, report_filename, summarize, top_categories,
    top_tenants,
};

use crate::{
    cli::{AddArgs, Command, FilterArgs, ListArgs, ReportArgs, SummaryArgs, UpdateArgs},
    error::{AppError, Result},
    settings::Settings,
};

type Coordinator = MutationCoordinator<SqlStore>;

pub async fn dispatch(command: Command, coordinator: &Coordinator, settings: &Settings) -> Result<()> {
    match command {
        Command::Add(args) => add(coordinator, &args).await,
        Command::List(args) => list(coordinator, &args).await,
        Command::Update(args) => update(coordinator, &args).await,
        Command::Delete { id } => coordinator.delete(&id).await.map_err(reported),
        Command::BulkDelete { ids } => coordinator.bulk_delete(&ids).await.map_err(reported),
        Command::Summary(args) => summary(coordinator, &args).await,
        Command::Export(args) => export(coordinator, &args, settings).await,
        Command::Report(args) => report(coordinator, &args, settings).await,
    }
}

/// The coordinator already raised a notification for `err`.
fn reported(err: EngineError) -> AppError {
    AppError::Reported(err.user_message())
}

fn report_fields<K: Display>(errors: BTreeMap<K, String>) -> AppError {
    for (field, message) in &errors {
        eprintln!("{field}: {message}");
    }
    AppError::Reported(format!("{} invalid field(s)", errors.len()))
}

fn flag_name(field: FilterField) -> &'static str {
    match field {
        FilterField::DateFrom => "--from",
        FilterField::DateTo => "--to",
        FilterField::Categories => "--category",
        FilterField::AmountMin => "--min",
        FilterField::AmountMax => "--max",
    }
}

fn filter_spec(args: &FilterArgs) -> Result<FilterSpec> {
    let by_flag = |errors: BTreeMap<FilterField, String>| {
        report_fields(
            errors
                .into_iter()
                .map(|(field, message)| (flag_name(field), message))
                .collect::<BTreeMap<_, _>>(),
        )
    };
    let spec = FilterSpec::from_raw(&args.raw()).map_err(by_flag)?;
    spec.validate().map_err(by_flag)?;
    Ok(spec)
}

async fn filtered_entries(coordinator: &Coordinator, args: &FilterArgs) -> Result<Vec<Entry>> {
    let spec = filter_spec(args)?;
    let entries = coordinator.entries().await?;
    Ok(filter_entries(&entries, &spec))
}

async fn add(coordinator: &Coordinator, args: &AddArgs) -> Result<()> {
    match coordinator.submit(&args.form()).await {
        Ok(entry) => {
            println!("{}", entry.id);
            Ok(())
        }
        Err(SubmitError::Invalid(result)) => Err(report_fields(result.errors)),
        Err(SubmitError::Engine(err)) => Err(reported(err)),
    }
}

async fn update(coordinator: &Coordinator, args: &UpdateArgs) -> Result<()> {
    let current = coordinator
        .entries()
        .await?
        .into_iter()
        .find(|entry| entry.id == args.id)
        .ok_or_else(|| EngineError::NotFound("Entry not found".to_string()))?;

    // The whole edited form is validated, not only the changed fields.
    let form = RawEntryForm {
        tenant: args.tenant.clone().unwrap_or_else(|| current.tenant.clone()),
        amount: args
            .amount
            .clone()
            .unwrap_or_else(|| current.amount.to_string()),
        category: args
            .category
            .clone()
            .unwrap_or_else(|| current.category.as_str().to_string()),
        description: args
            .description
            .clone()
            .unwrap_or_else(|| current.description.clone()),
        date: args
            .date
            .clone()
            .unwrap_or_else(|| current.date.format("%Y-%m-%d").to_string()),
    };
    let parsed = parse_form_at(&form, Utc::now()).map_err(|result| report_fields(result.errors))?;

    let patch = EntryPatch {
        date: args.date.as_ref().map(|_| parsed.date),
        tenant: args.tenant.as_ref().map(|_| parsed.tenant.clone()),
        amount: args.amount.as_ref().map(|_| parsed.amount),
        category: args.category.as_ref().map(|_| parsed.category),
        description: args.description.as_ref().map(|_| parsed.description.clone()),
    };
    if patch.is_empty() {
        eprintln!("nothing to update");
        return Ok(());
    }
    coordinator.update(&args.id, &patch).await.map_err(reported)
}

fn print_entries(entries: &[Entry]) {
    for entry in entries {
        println!(
            "{}  {}  {:<24}  {:>16}  {:<16}  {}",
            entry.id,
            entry.date,
            entry.tenant,
            format_currency(entry.amount),
            entry.category.as_str(),
            entry.description
        );
    }
}

async fn list(coordinator: &Coordinator, args: &ListArgs) -> Result<()> {
    let Some(limit) = args.limit else {
        let entries = filtered_entries(coordinator, &args.filter).await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        } else {
            print_entries(&entries);
        }
        return Ok(());
    };

    let spec = filter_spec(&args.filter)?;
    let Some(user) = coordinator.current_user() else {
        return Ok(());
    };
    let request = PageRequest {
        limit,
        cursor: args.cursor.clone(),
    };
    let page = coordinator.store().search(&user, &spec, &request).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        print_entries(&page.data);
        if let Some(cursor) = &page.next_cursor {
            eprintln!("more entries: --cursor {cursor}");
        }
    }
    Ok(())
}

async fn summary(coordinator: &Coordinator, args: &SummaryArgs) -> Result<()> {
    let entries = filtered_entries(coordinator, &args.filter).await?;
    let summary = summarize(&entries);
    let statement = summary.income_statement();

    println!("Entries   {}", summary.total_entries);
    println!("Income    {}", format_currency(statement.income));
    println!("Expenses  {}", format_currency(statement.expenses));
    println!("Net       {}", format_currency(statement.net));
    println!("Average   {}", format_currency(summary.average_amount));

    println!("\nBy category");
    for share in top_categories(&summary) {
        println!(
            "  {:<16}  {:>4}  {:>16}  {:>5.1}%",
            share.category.as_str(),
            share.count,
            format_currency(share.total),
            share.percentage
        );
    }

    println!("\nTop tenants");
    for share in top_tenants(&summary, args.top) {
        println!(
            "  {:<24}  {:>4}  {:>16}  {:>5.1}%",
            share.tenant,
            share.count,
            format_currency(share.total),
            share.percentage
        );
    }

    println!("\nBy month");
    for (month, items) in group_by_month(&entries) {
        let total: f64 = items.iter().map(|entry| entry.amount).sum();
        println!("  {month}  {:>4}  {:>16}", items.len(), format_currency(total));
    }
    Ok(())
}

async fn export(coordinator: &Coordinator, args: &FilterArgs, settings: &Settings) -> Result<()> {
    let entries = filtered_entries(coordinator, args).await?;
    let path = export_to_dir(&settings.export_dir, Utc::now().date_naive(), &entries)?;
    println!("{}", path.display());
    Ok(())
}

async fn report(coordinator: &Coordinator, args: &ReportArgs, settings: &Settings) -> Result<()> {
    let entries = filtered_entries(coordinator, &args.filter).await?;
    let today = Utc::now().date_naive();
    let path = settings.export_dir.join(report_filename(today));
    std::fs::write(&path, render_report(&entries, &args.title, today))?;
    tracing::info!("wrote report of {} entries to {}", entries.len(), path.display());
    println!("{}", path.display());
    Ok(())
}
