//! Report generation

use anyhow::{Context, Result};
use pandaloto_business::{AdminService, WalletService, DEFAULT_HISTORY_LIMIT};
use pandaloto_persistence::TimePeriod;
use pandaloto_reports::{
    CsvExporter, FraudReport, JsonExporter, MarkdownExporter, OverviewReport, ReportData,
    ReportExporter, StatementReport, TimeSeriesReport, TopUsersReport, UserRiskReport,
};
use std::path::PathBuf;

use crate::db::App;
use crate::{ReportFormat, ReportKind};

const DEFAULT_TOP_USERS: i64 = 10;

pub struct ReportRequest {
    pub kind: ReportKind,
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
    pub period: TimePeriod,
    pub limit: Option<i64>,
    pub user: Option<String>,
}

fn exporter(format: ReportFormat) -> Box<dyn ReportExporter> {
    match format {
        ReportFormat::Csv => Box::new(CsvExporter::new()),
        ReportFormat::Json => Box::new(JsonExporter::new()),
        ReportFormat::Markdown => Box::new(MarkdownExporter::new()),
    }
}

pub async fn generate(app: &App, actor: Option<&str>, request: ReportRequest) -> Result<()> {
    let (me, req) = app.session(actor).await?;
    let admin = AdminService::new(&app.ctx);
    let now = app.ctx.now();

    let report: Box<dyn ReportData> = match request.kind {
        ReportKind::Overview => {
            let overview = admin.analytics_overview(&req).await?;
            Box::new(OverviewReport::new("Visão Geral da Plataforma", overview, now))
        }
        ReportKind::TopUsers => {
            let limit = request.limit.unwrap_or(DEFAULT_TOP_USERS);
            let users = admin.top_users(&req, limit).await?;
            Box::new(TopUsersReport::new("Maiores Apostadores", users, now))
        }
        ReportKind::TimeSeries => {
            let points = admin.transaction_time_series(&req, request.period).await?;
            Box::new(TimeSeriesReport::new("Transações por Período", request.period, points, now))
        }
        ReportKind::Statement => {
            let target = app.target(&me, request.user.as_deref()).await?;
            let limit = request.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
            let entries = WalletService::new(&app.ctx)
                .transactions(&req, &target.id, limit)
                .await?;
            let title = format!("Extrato de {}", target.username);
            Box::new(StatementReport::new(&title, entries, now))
        }
        ReportKind::Fraud => {
            let alerts = admin.list_fraud_alerts(&req, None).await?;
            Box::new(FraudReport::generate("Relatório de Fraude", &alerts, now))
        }
        ReportKind::UserRisk => {
            let alerts = admin.list_fraud_alerts(&req, None).await?;
            Box::new(UserRiskReport::generate("Risco por Jogador", &alerts, now))
        }
    };

    let exporter = exporter(request.format);
    let rendered = exporter.export(report.as_ref());

    match request.output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("📝 Report written to {} ({})", path.display(), exporter.mime_type());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}
