use crate::cli::{CalculateArgs, ExplainArgs, SummaryArgs};
use crate::infra::{RunContext, TerminalManualAmounts};
use incentive_engine::error::AppError;
use incentive_engine::period::EvaluationMonth;
use incentive_engine::workflows::incentive::{
    EmployeeExplanation, IncentiveEngine, ManualAmountProvider, MonthlyRun, NoManualAmounts,
    ResultRow, ResultStore, RunReport,
};
use incentive_engine::workflows::sources::EmployeeId;
use serde::Serialize;
use tracing::info;

pub(crate) fn run_calculate(args: CalculateArgs) -> Result<(), AppError> {
    let CalculateArgs {
        month,
        storage,
        history_floor,
        max_depth,
        no_prompt,
        json,
    } = args;

    let RunContext {
        config,
        policy,
        catalog,
        store,
    } = RunContext::load(storage)?;

    let mut chain = config.chain;
    if history_floor.is_some() {
        chain.history_floor = history_floor;
    }
    if let Some(max_depth) = max_depth {
        chain.max_depth = max_depth;
    }

    let manual: &dyn ManualAmountProvider = if no_prompt {
        &NoManualAmounts
    } else {
        &TerminalManualAmounts
    };
    let engine = IncentiveEngine::new(policy);
    let outcome = MonthlyRun::new(&catalog, &store, &engine, manual, chain).run(month)?;

    let mut summaries = Vec::with_capacity(outcome.prior_months.len() + 1);
    for evaluated in outcome.prior_months.iter().chain(std::iter::once(&outcome.month)) {
        let evaluated_month = evaluated.table.month();
        info!(month = %evaluated_month, path = %store.path_for(evaluated_month).display(), "month materialized");
        let rows = ResultRow::from_table(&evaluated.table);
        summaries.push(
            RunReport::from_rows(evaluated_month, &rows)
                .with_notes(evaluated.audit.notes())
                .summary(),
        );
    }

    if json {
        print_json(&summaries)?;
    } else {
        for summary in &summaries {
            println!("{}", summary.render_text());
            println!("Results written to {}", store.path_for(summary.month).display());
        }
    }
    Ok(())
}

pub(crate) fn run_summary(args: SummaryArgs) -> Result<(), AppError> {
    let SummaryArgs {
        month,
        storage,
        json,
    } = args;

    let context = RunContext::load(storage)?;
    let rows = load_month(&context, month)?;
    let summary = RunReport::from_rows(month, &rows).summary();

    if json {
        print_json(&summary)
    } else {
        println!("{}", summary.render_text());
        Ok(())
    }
}

pub(crate) fn run_explain(args: ExplainArgs) -> Result<(), AppError> {
    let ExplainArgs {
        month,
        employee,
        storage,
        json,
    } = args;

    let employee_id = EmployeeId::parse(&employee)
        .ok_or_else(|| AppError::NotFound(format!("employee number '{employee}' is not valid")))?;
    let context = RunContext::load(storage)?;
    let rows = load_month(&context, month)?;
    let row = rows
        .iter()
        .find(|row| row.employee_id == employee_id.as_str())
        .ok_or_else(|| AppError::NotFound(format!("employee {employee_id} in {month} results")))?;
    let explanation = EmployeeExplanation::from_row(month, row);

    if json {
        print_json(&explanation)
    } else {
        render_explanation(&explanation);
        Ok(())
    }
}

fn load_month(context: &RunContext, month: EvaluationMonth) -> Result<Vec<ResultRow>, AppError> {
    context.store.load_rows(month)?.ok_or_else(|| {
        AppError::NotFound(format!(
            "result table {}; run `calculate --month {month}` first",
            context.store.path_for(month).display()
        ))
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(|err| AppError::Io(err.into()))?;
    println!("{rendered}");
    Ok(())
}

fn render_explanation(explanation: &EmployeeExplanation) {
    println!(
        "{} {} ({}, {})",
        explanation.employee_id,
        explanation.name,
        explanation.role_type.label(),
        explanation.position_name
    );
    println!("Month: {}", explanation.month);
    println!("Archetype: {}", explanation.archetype_label);
    println!(
        "Incentive: {} VND ({})",
        explanation.incentive_amount, explanation.reason_summary
    );
    println!(
        "Attendance: {} of {} days, {} unapproved, absence {:.2}% ({})",
        explanation.actual_working_days,
        explanation.total_working_days,
        explanation.unapproved_absence_days,
        explanation.absence_rate_percent,
        if explanation.attendance_passed {
            "passed"
        } else {
            "failed"
        }
    );
    println!(
        "AQL: {} failures this month{}",
        explanation.aql_failures,
        if explanation.continuous_aql_fail {
            ", continuous failure streak"
        } else {
            ""
        }
    );
    println!(
        "5PRS: {} pairs audited, {:.2}% pass rate",
        explanation.audit_volume, explanation.audit_pass_rate_percent
    );
    if let Some(rate) = explanation.area_reject_rate_percent {
        println!("Area reject rate: {rate:.2}%");
    }
    println!(
        "Continuity: {} VND last month, {} qualifying months",
        explanation.previous_incentive_amount, explanation.continuous_qualifying_months
    );
    let [part1, part2, part3] = explanation.parts;
    if part2 > 0 || part3 > 0 {
        println!("Parts: {part1} + {part2} + {part3}");
    }
}
