use axum::extract::Extension;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use tutor_scheduling::config::AppConfig;
use tutor_scheduling::error::AppError;
use tutor_scheduling::telemetry;
use tutor_scheduling::workflows::scheduling::memory::{
    InMemoryCenterDirectory, InMemoryContractStore, InMemoryRescheduleStore,
    InMemoryTutorDirectory, RecordingBookingGateway, RecordingRefundLedger,
};
use tutor_scheduling::workflows::scheduling::{
    contract_router, placement_router, reschedule_router, suggest_centers, BookingId, Center,
    CenterId, Contract, ContractId, ContractService, ContractSnapshot, ContractStore, GeoPoint,
    PlacementService, RequestId, RescheduleService, RescheduleSubmission, SchedulingError,
    TimeSlot, Tutor, TutorId, TutorSnapshot,
};

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: Arc<PrometheusHandle>,
}

#[derive(Parser, Debug)]
#[command(
    name = "Tutoring Scheduling Core",
    about = "Run the scheduling and assignment service for the tutoring marketplace",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Suggest centers around a coordinate using the sample catalog
    Centers(CentersArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
    /// Load the built-in sample data set at startup
    #[arg(long)]
    seed: bool,
}

#[derive(Args, Debug)]
struct CentersArgs {
    /// Latitude of the tutor
    #[arg(long)]
    lat: f64,
    /// Longitude of the tutor
    #[arg(long)]
    lon: f64,
    /// Search radius in kilometers
    #[arg(long, default_value_t = 10.0)]
    radius_km: f64,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Centers(args) => run_center_suggestions(args),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let contracts = Arc::new(InMemoryContractStore::default());
    let requests = Arc::new(InMemoryRescheduleStore::default());
    let tutors = if args.seed {
        Arc::new(InMemoryTutorDirectory::with_tutors(sample_tutors()))
    } else {
        Arc::new(InMemoryTutorDirectory::default())
    };
    let centers = if args.seed {
        Arc::new(InMemoryCenterDirectory::with_centers(sample_centers()))
    } else {
        Arc::new(InMemoryCenterDirectory::default())
    };
    let bookings = Arc::new(RecordingBookingGateway::default());
    let wallet = Arc::new(RecordingRefundLedger::default());

    let contract_service = Arc::new(ContractService::new(contracts.clone(), tutors.clone()));
    let reschedule_service = Arc::new(RescheduleService::new(
        requests,
        tutors.clone(),
        bookings,
        wallet,
    ));
    let placement_service = Arc::new(PlacementService::new(tutors.clone(), centers));

    if args.seed {
        seed_records(&contracts, &tutors, &reschedule_service)?;
    }

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .merge(contract_router(contract_service))
        .merge(reschedule_router(reschedule_service))
        .merge(placement_router(placement_service))
        .layer(Extension(state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "scheduling core ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_center_suggestions(args: CentersArgs) -> Result<(), AppError> {
    let origin = GeoPoint {
        latitude: args.lat,
        longitude: args.lon,
    };
    let catalog = sample_centers();
    let suggestions = suggest_centers(origin, args.radius_km, &catalog);

    println!(
        "Centers within {:.1} km of ({:.4}, {:.4})",
        args.radius_km, args.lat, args.lon
    );
    if suggestions.is_empty() {
        println!("- none in range; try a wider radius");
        return Ok(());
    }

    for suggestion in suggestions {
        println!(
            "- {} ({}) at {:.2} km, {} tutors",
            suggestion.center.name,
            suggestion.center.id,
            suggestion.distance_km,
            suggestion.center.tutor_count
        );
    }

    Ok(())
}

fn seed_records(
    contracts: &Arc<InMemoryContractStore>,
    tutors: &Arc<InMemoryTutorDirectory>,
    reschedules: &Arc<
        RescheduleService<
            InMemoryRescheduleStore,
            InMemoryTutorDirectory,
            RecordingBookingGateway,
            RecordingRefundLedger,
        >,
    >,
) -> Result<(), AppError> {
    for snapshot in sample_contracts() {
        contracts
            .insert(Contract::from_snapshot(snapshot))
            .map_err(SchedulingError::from)?;
    }

    for submission in sample_requests() {
        let request_id = submission.id.clone();
        reschedules.submit(submission)?;
        tutors.set_substitutes(
            request_id,
            vec![TutorId("tutor-02".to_string()), TutorId("tutor-03".to_string())],
        );
    }

    Ok(())
}

fn slot(start: (u32, u32), end: (u32, u32)) -> TimeSlot {
    TimeSlot {
        start: NaiveTime::from_hms_opt(start.0, start.1, 0).expect("valid slot start"),
        end: NaiveTime::from_hms_opt(end.0, end.1, 0).expect("valid slot end"),
    }
}

fn sample_centers() -> Vec<Center> {
    vec![
        Center {
            id: CenterId("center-riverside".to_string()),
            name: "Riverside Learning Center".to_string(),
            latitude: 10.7769,
            longitude: 106.7009,
            tutor_count: 12,
        },
        Center {
            id: CenterId("center-northgate".to_string()),
            name: "Northgate Study Hub".to_string(),
            latitude: 10.8231,
            longitude: 106.6297,
            tutor_count: 8,
        },
        Center {
            id: CenterId("center-lakeview".to_string()),
            name: "Lakeview Tutoring House".to_string(),
            latitude: 10.7308,
            longitude: 106.7217,
            tutor_count: 5,
        },
    ]
}

fn sample_tutors() -> Vec<Tutor> {
    // The sample set arrives in the upstream snapshot shape, including the
    // legacy "active" verification value, and is hydrated like real intake.
    let snapshots = vec![
        TutorSnapshot {
            user_id: TutorId("tutor-01".to_string()),
            full_name: "An Nguyen".to_string(),
            location: Some(GeoPoint {
                latitude: 10.78,
                longitude: 106.69,
            }),
            verification: "approved".to_string(),
            center_id: Some(CenterId("center-riverside".to_string())),
        },
        TutorSnapshot {
            user_id: TutorId("tutor-02".to_string()),
            full_name: "Binh Tran".to_string(),
            location: Some(GeoPoint {
                latitude: 10.80,
                longitude: 106.65,
            }),
            verification: "active".to_string(),
            center_id: Some(CenterId("center-riverside".to_string())),
        },
        TutorSnapshot {
            user_id: TutorId("tutor-03".to_string()),
            full_name: "Chi Le".to_string(),
            location: None,
            verification: "approved".to_string(),
            center_id: Some(CenterId("center-northgate".to_string())),
        },
        TutorSnapshot {
            user_id: TutorId("tutor-04".to_string()),
            full_name: "Dung Pham".to_string(),
            location: Some(GeoPoint {
                latitude: 10.73,
                longitude: 106.72,
            }),
            verification: "not_verified".to_string(),
            center_id: None,
        },
    ];

    snapshots.into_iter().map(Tutor::from_snapshot).collect()
}

fn sample_contracts() -> Vec<ContractSnapshot> {
    vec![
        ContractSnapshot {
            id: ContractId("contract-1001".to_string()),
            child_id: "child-501".to_string(),
            package_id: "package-math-12w".to_string(),
            center_id: Some(CenterId("center-riverside".to_string())),
            start_date: NaiveDate::from_ymd_opt(2026, 9, 7).expect("valid date"),
            end_date: NaiveDate::from_ymd_opt(2026, 11, 30).expect("valid date"),
            time_slot: slot((16, 30), (18, 0)),
            is_online: false,
            tutors: None,
            status: "Pending".to_string(),
        },
        ContractSnapshot {
            id: ContractId("contract-1002".to_string()),
            child_id: "child-502".to_string(),
            package_id: "package-english-8w".to_string(),
            center_id: None,
            start_date: NaiveDate::from_ymd_opt(2026, 9, 1).expect("valid date"),
            end_date: NaiveDate::from_ymd_opt(2026, 10, 27).expect("valid date"),
            time_slot: slot((19, 0), (20, 30)),
            is_online: true,
            tutors: None,
            // Upstream occasionally sends statuses this shape; hydration
            // degrades it to pending with a warning.
            status: "AWAITING_REVIEW".to_string(),
        },
    ]
}

fn sample_requests() -> Vec<RescheduleSubmission> {
    vec![RescheduleSubmission {
        id: RequestId("request-7001".to_string()),
        booking_id: BookingId("booking-9001".to_string()),
        contract_id: ContractId(
            "contract-1001".to_string(),
        ),
        origin: None,
        original_session_date: "2026-09-14T16:30:00".to_string(),
        original_start_time: None,
        original_end_time: None,
        original_tutor_id: Some(TutorId("tutor-01".to_string())),
        requested_date: NaiveDate::from_ymd_opt(2026, 9, 16).expect("valid date"),
        requested_slot: slot((16, 30), (18, 0)),
        requested_tutor_id: None,
        reason: "[CHANGE TUTOR] recurring clash with school club".to_string(),
    }]
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
