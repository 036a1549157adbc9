use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_desk::api::memory::seeded_demo;
use order_desk::api::{HttpOrderApi, OrderApi, SortKey};
use order_desk::config::DeskConfig;
use order_desk::domain::order::{NoteType, Order, OrderId, OrderStatus, PaymentMethod};
use order_desk::metrics::Metrics;
use order_desk::workflow::{BulkAction, TracingNotifier};
use order_desk::OrderDesk;

/// Order lifecycle and COD verification desk
#[derive(Debug, Parser)]
#[command(name = "order-desk", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: DeskConfig,

    /// Run against a seeded in-memory backend instead of the REST API
    #[arg(long)]
    demo: bool,

    /// Print Prometheus metrics after the command
    #[arg(long)]
    print_metrics: bool,

    /// Print orders as JSON
    #[arg(long)]
    json: bool,

    /// Log filter, overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List one page of orders
    List {
        #[arg(long)]
        status: Option<OrderStatus>,
        #[arg(long)]
        payment_method: Option<PaymentMethod>,
        #[arg(long)]
        cod: Option<bool>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value = "1")]
        page: u32,
        /// e.g. `-created_at`, `total_amount`
        #[arg(long, allow_hyphen_values = true)]
        ordering: Option<SortKey>,
    },
    /// Show one order with its history
    Show { id: OrderId },
    /// Move an order to any status
    Transition {
        id: OrderId,
        status: OrderStatus,
        #[arg(long)]
        notes: Option<String>,
    },
    Confirm { id: OrderId },
    Deliver { id: OrderId },
    Cancel {
        id: OrderId,
        #[arg(long)]
        notes: Option<String>,
    },
    VerifyCod {
        id: OrderId,
        #[arg(long)]
        notes: Option<String>,
    },
    RejectCod {
        id: OrderId,
        #[arg(long)]
        notes: String,
    },
    CodPaid { id: OrderId },
    /// Add a note to an order
    Note {
        id: OrderId,
        note: String,
        #[arg(long, default_value = "general")]
        note_type: NoteType,
        #[arg(long)]
        internal: bool,
    },
    /// Apply one action to many orders: a status name, verify_cod, reject_cod or cod_paid
    Bulk {
        action: String,
        #[arg(required = true)]
        ids: Vec<OrderId>,
        #[arg(long)]
        notes: Option<String>,
    },
}

impl Cli {
    fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,order_desk=debug")),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = match Cli::load() {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };
    init_tracing(cli.log_level.as_deref());
    cli.config.validate()?;

    let metrics = Arc::new(Metrics::new()?);
    let api: Arc<dyn OrderApi> = if cli.demo {
        tracing::info!("Using seeded in-memory backend");
        Arc::new(seeded_demo())
    } else {
        tracing::info!(base_url = %cli.config.base_url, "Using REST backend");
        Arc::new(HttpOrderApi::new(&cli.config)?.with_metrics(Arc::clone(&metrics)))
    };

    let mut desk = OrderDesk::new(
        api,
        Arc::new(TracingNotifier),
        Arc::clone(&metrics),
        cli.config.actor.clone(),
        cli.config.page_size,
    );

    let result = run(&mut desk, cli.command, cli.json).await;

    if cli.print_metrics {
        println!("{}", metrics.render()?);
    }
    result
}

async fn run(desk: &mut OrderDesk, command: Command, json: bool) -> anyhow::Result<()> {
    match command {
        Command::List {
            status,
            payment_method,
            cod,
            from,
            to,
            search,
            page,
            ordering,
        } => {
            desk.update_query(|q| {
                q.set_status(status);
                q.set_payment_method(payment_method);
                q.set_is_cod(cod);
                q.set_date_from(from);
                q.set_date_to(to);
                q.set_search(search.unwrap_or_default());
                q.set_ordering(ordering);
                q.set_page(page);
            });

            let page = desk.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page.orders)?);
            } else {
                for order in &page.orders {
                    println!("{}", summary_line(order));
                }
                println!(
                    "page {} of {} ({} orders)",
                    page.page,
                    page.total_pages().max(1),
                    page.count
                );
            }
        }

        Command::Show { id } => {
            let order = desk.fetch_order(id).await?;
            print_order(&order, json)?;
        }

        Command::Transition { id, status, notes } => {
            let order = desk.fetch_order(id).await?;
            let order = desk.request_transition(&order, status, notes.as_deref()).await?;
            print_order(&order, json)?;
        }

        Command::Confirm { id } => {
            let order = desk.fetch_order(id).await?;
            print_order(&desk.confirm(&order).await?, json)?;
        }

        Command::Deliver { id } => {
            let order = desk.fetch_order(id).await?;
            print_order(&desk.mark_delivered(&order).await?, json)?;
        }

        Command::Cancel { id, notes } => {
            let order = desk.fetch_order(id).await?;
            print_order(&desk.cancel(&order, notes.as_deref()).await?, json)?;
        }

        Command::VerifyCod { id, notes } => {
            let order = desk.fetch_order(id).await?;
            print_order(&desk.verify_cod(&order, notes.as_deref()).await?, json)?;
        }

        Command::RejectCod { id, notes } => {
            let order = desk.fetch_order(id).await?;
            print_order(&desk.reject_cod(&order, &notes).await?, json)?;
        }

        Command::CodPaid { id } => {
            let order = desk.fetch_order(id).await?;
            print_order(&desk.mark_cod_paid(&order).await?, json)?;
        }

        Command::Note {
            id,
            note,
            note_type,
            internal,
        } => {
            let order = desk.fetch_order(id).await?;
            print_order(&desk.add_note(&order, note_type, &note, internal).await?, json)?;
        }

        Command::Bulk { action, ids, notes } => {
            let action = BulkAction::parse(&action, notes)?;
            let outcome = desk.apply_bulk(&ids, &action).await?;

            for item in &outcome.results {
                match &item.error {
                    None => println!("{:>8}  ok", item.order_id),
                    Some(e) => println!("{:>8}  failed: {e}", item.order_id),
                }
            }
            println!("{}", outcome.summary().0);
        }
    }

    Ok(())
}

fn summary_line(order: &Order) -> String {
    let cod = order
        .cod_status()
        .map(|s| format!(" cod={s}"))
        .unwrap_or_default();
    format!(
        "{:>6}  {:<10} {:<17} {:<16} UGX {:>10}  {}{}",
        order.id,
        order.order_number,
        order.status,
        order.payment_method,
        order.total_amount,
        order.customer_name,
        cod
    )
}

fn print_order(order: &Order, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(order)?);
        return Ok(());
    }

    println!("{}", summary_line(order));
    if let Some(phone) = &order.customer_phone {
        println!("  phone:    {phone}");
    }
    if let Some(address) = &order.delivery_address {
        println!("  address:  {address}");
    }
    for item in &order.items {
        println!(
            "  item:     {} x {} @ {} = {}",
            item.quantity,
            item.product_name,
            item.unit_price,
            item.line_total()
        );
    }
    for change in &order.status_history {
        println!(
            "  history:  {} {} -> {} by {}{}",
            change.created_at.format("%Y-%m-%d %H:%M"),
            change.previous_status,
            change.new_status,
            change.changed_by,
            change.notes.as_deref().map(|n| format!(" ({n})")).unwrap_or_default()
        );
    }
    for note in &order.notes {
        println!(
            "  note:     [{:?}{}] {} by {}",
            note.note_type,
            if note.is_internal { ", internal" } else { "" },
            note.note,
            note.created_by
        );
    }
    Ok(())
}
