use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, TimeZone, Utc};
use billbook_core::{
    Aggregate, AggregateId, Currency, CustomerId, ExpectedVersion, LineItemId, Money, PaymentId,
    Rate, SystemClock,
};
use billbook_infra::command_dispatcher::CommandDispatcher;
use billbook_infra::event_store::{EventStore, InMemoryEventStore, UncommittedEvent};
use billbook_infra::{
    INVOICE_AGGREGATE_TYPE, InMemoryCustomerDirectory, InvoiceService, LineItemInput, NewInvoice,
    Settings,
};
use billbook_invoicing::{
    AddLineItem, CreateInvoice, Invoice, InvoiceCommand, InvoiceId, MarkInvoiceAsSent,
    PaymentMethod, Quantity, RecordPayment,
};

fn usd(minor: i64) -> Money {
    Money::from_minor(minor, Currency::usd())
}

/// Commands that build a sent invoice with `lines` lines and `payments` one-cent payments.
fn history(id: InvoiceId, lines: usize, payments: usize) -> Vec<InvoiceCommand> {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut commands = vec![InvoiceCommand::CreateInvoice(CreateInvoice {
        invoice_id: id,
        invoice_number: "INV-000001".to_string(),
        customer_id: CustomerId::new(),
        company_info: None,
        currency: Currency::usd(),
        tax_rate: Some(Rate::from_ppm(80_000)),
        notes: None,
        terms: None,
        issue_date: at,
        due_date: at + Duration::days(30),
        occurred_at: at,
    })];
    for i in 0..lines {
        commands.push(InvoiceCommand::AddLineItem(AddLineItem {
            invoice_id: id,
            line_item_id: LineItemId::new(),
            description: format!("Line {i}"),
            quantity: Quantity::whole(1).unwrap(),
            unit_price: usd(10_000),
            occurred_at: at,
        }));
    }
    commands.push(InvoiceCommand::MarkInvoiceAsSent(MarkInvoiceAsSent {
        invoice_id: id,
        occurred_at: at,
    }));
    for _ in 0..payments {
        commands.push(InvoiceCommand::RecordPayment(RecordPayment {
            invoice_id: id,
            payment_id: PaymentId::new(),
            amount: usd(1),
            method: PaymentMethod::Cash,
            payment_date: at,
            reference: None,
            notes: None,
            occurred_at: at,
        }));
    }
    commands
}

fn seeded_store(id: InvoiceId, lines: usize, payments: usize) -> InMemoryEventStore {
    let store = InMemoryEventStore::new();
    let mut invoice = Invoice::empty(id);
    for command in history(id, lines, payments) {
        let (next, events) = invoice.execute(&command).unwrap();
        let uncommitted = events
            .iter()
            .map(|e| {
                UncommittedEvent::from_typed(id.0, INVOICE_AGGREGATE_TYPE, uuid::Uuid::now_v7(), e)
            })
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        store.append(uncommitted, ExpectedVersion::Any).unwrap();
        invoice = next;
    }
    store
}

fn bench_rehydration(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoice_rehydration");

    for payments in [10usize, 100, 1000].iter() {
        let id = InvoiceId::new(AggregateId::new());
        let dispatcher = CommandDispatcher::new(seeded_store(id, 50, *payments));
        group.throughput(Throughput::Elements((*payments + 52) as u64));
        group.bench_with_input(
            BenchmarkId::new("load_from_stream", payments),
            payments,
            |b, _| {
                b.iter(|| {
                    let invoice = dispatcher
                        .load(black_box(id.0), |aid| Invoice::empty(InvoiceId::new(aid)))
                        .unwrap();
                    black_box(invoice.balance());
                });
            },
        );
    }

    group.finish();
}

fn bench_command_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoice_command_throughput");

    // Pure decision + evolve, no storage.
    group.bench_function("execute_add_line_item_in_memory", |b| {
        let id = InvoiceId::new(AggregateId::new());
        let mut invoice = Invoice::empty(id);
        for command in history(id, 0, 0).into_iter().take(1) {
            invoice = invoice.execute(&command).unwrap().0;
        }
        let command = InvoiceCommand::AddLineItem(AddLineItem {
            invoice_id: id,
            line_item_id: LineItemId::new(),
            description: "Consulting".to_string(),
            quantity: Quantity::whole(3).unwrap(),
            unit_price: usd(12_345),
            occurred_at: Utc::now(),
        });
        b.iter(|| black_box(invoice.execute(black_box(&command)).unwrap()));
    });

    // Full pipeline through the service: create + line item per iteration.
    group.bench_function("service_create_and_add_line", |b| {
        let customer = CustomerId::new();
        let service = InvoiceService::new(
            InMemoryEventStore::new(),
            InMemoryCustomerDirectory::with_customers([customer]),
            SystemClock,
            Settings::default(),
        );
        b.iter(|| {
            let (id, _) = service.create_invoice(NewInvoice::for_customer(customer)).unwrap();
            service
                .add_line_item(
                    id,
                    LineItemInput {
                        description: black_box("Consulting".to_string()),
                        quantity: Quantity::whole(2).unwrap(),
                        unit_price: usd(5_000),
                    },
                )
                .unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_rehydration, bench_command_throughput);
criterion_main!(benches);
