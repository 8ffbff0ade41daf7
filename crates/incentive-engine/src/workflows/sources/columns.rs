use super::normalizer::normalize_header;

/// A logical column and the header names it has been exported under, most preferred first.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub field: &'static str,
    pub aliases: &'static [&'static str],
}

impl ColumnSpec {
    pub const fn new(field: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { field, aliases }
    }
}

/// Finds the index of the header matching `spec`.
///
/// Passes run in order and the first pass with any hit wins:
/// 1. exact header text,
/// 2. case-insensitive header text,
/// 3. the normalized alias is a substring of the normalized header.
///
/// `None` means the caller applies its default.
pub fn resolve_column(headers: &[String], spec: &ColumnSpec) -> Option<usize> {
    let trimmed: Vec<&str> = headers.iter().map(|header| header.trim()).collect();

    for alias in spec.aliases {
        if let Some(index) = trimmed.iter().position(|header| header == alias) {
            return Some(index);
        }
    }

    for alias in spec.aliases {
        if let Some(index) = trimmed
            .iter()
            .position(|header| header.eq_ignore_ascii_case(alias))
        {
            return Some(index);
        }
    }

    let normalized: Vec<String> = trimmed.iter().map(|header| normalize_header(header)).collect();
    for alias in spec.aliases {
        let needle = normalize_header(alias);
        if needle.is_empty() {
            continue;
        }
        if let Some(index) = normalized.iter().position(|header| header.contains(&needle)) {
            return Some(index);
        }
    }

    None
}

pub mod roster {
    use super::ColumnSpec;

    pub const EMPLOYEE_ID: ColumnSpec = ColumnSpec::new(
        "employee_id",
        &["Employee No", "Employee ID", "ID No", "Emp No", "employee_id"],
    );
    pub const NAME: ColumnSpec =
        ColumnSpec::new("name", &["Full Name", "Employee Name", "Name", "name"]);
    pub const ROLE_TYPE: ColumnSpec = ColumnSpec::new(
        "role_type",
        &["ROLE TYPE STD", "Role Type", "Type", "role_type"],
    );
    pub const POSITION: ColumnSpec = ColumnSpec::new(
        "position_name",
        &[
            "QIP POSITION 1ST NAME",
            "Position Name",
            "Position",
            "position_name",
        ],
    );
    pub const MANAGER: ColumnSpec = ColumnSpec::new(
        "manager",
        &[
            "MST direct boss name",
            "Direct Boss",
            "Manager ID",
            "Manager",
            "manager_id",
        ],
    );
    pub const ENTRANCE_DATE: ColumnSpec = ColumnSpec::new(
        "entrance_date",
        &["Entrance Date", "Join Date", "Start Date", "entrance_date"],
    );
    pub const TERMINATION_DATE: ColumnSpec = ColumnSpec::new(
        "termination_date",
        &[
            "Stop working Date",
            "Termination Date",
            "Resign Date",
            "termination_date",
        ],
    );
}

pub mod attendance {
    use super::ColumnSpec;

    pub const EMPLOYEE_ID: ColumnSpec = ColumnSpec::new(
        "employee_id",
        &["ID No", "Employee No", "Employee ID", "employee_id"],
    );
    pub const TOTAL_DAYS: ColumnSpec = ColumnSpec::new(
        "total_working_days",
        &["Total Working Days", "Total Days", "total_working_days"],
    );
    pub const ACTUAL_DAYS: ColumnSpec = ColumnSpec::new(
        "actual_working_days",
        &["Actual Working Days", "Actual Days", "actual_working_days"],
    );
    pub const UNAPPROVED_DAYS: ColumnSpec = ColumnSpec::new(
        "unapproved_absence_days",
        &[
            "Unapproved Absence Days",
            "Unapproved Absences",
            "unapproved_absence_days",
        ],
    );
    pub const ABSENCE_RATE: ColumnSpec = ColumnSpec::new(
        "absence_rate_percent",
        &["Absence Rate (raw) (%)", "Absence Rate", "absence_rate_percent"],
    );
    pub const WORK_DATE: ColumnSpec =
        ColumnSpec::new("work_date", &["Work Date", "Attendance Date", "work_date"]);
    pub const STATUS: ColumnSpec = ColumnSpec::new(
        "status",
        &["compAdd", "Attendance Status", "Status", "status"],
    );
    pub const REASON: ColumnSpec = ColumnSpec::new(
        "reason",
        &["Reason Description", "Absence Reason", "Reason", "reason"],
    );
}

pub mod aql {
    use super::ColumnSpec;

    pub const EMPLOYEE_ID: ColumnSpec = ColumnSpec::new(
        "employee_id",
        &["EMPLOYEE NO", "Inspector ID", "ID No", "employee_id"],
    );
    pub const RESULT: ColumnSpec =
        ColumnSpec::new("result", &["RESULT", "Inspection Result", "result"]);
    pub const AREA: ColumnSpec =
        ColumnSpec::new("area", &["BUILDING", "Building", "Area", "area"]);
    pub const DATE: ColumnSpec = ColumnSpec::new(
        "inspection_date",
        &["Inspection Date", "DATE", "inspection_date"],
    );
}

pub mod audit {
    use super::ColumnSpec;

    pub const TARGET_ID: ColumnSpec = ColumnSpec::new(
        "target_employee_id",
        &[
            "Inspection Target ID",
            "TQC ID",
            "Target ID",
            "target_employee_id",
        ],
    );
    pub const VALIDATION_QTY: ColumnSpec = ColumnSpec::new(
        "validation_qty",
        &["Valiation_Qty", "Validation_Qty", "Validation Qty", "validation_qty"],
    );
    pub const PASS_QTY: ColumnSpec =
        ColumnSpec::new("pass_qty", &["Pass_Qty", "Pass Qty", "pass_qty"]);
}

pub mod results {
    use super::ColumnSpec;

    pub const EMPLOYEE_ID: ColumnSpec =
        ColumnSpec::new("employee_id", &["employee_id", "Employee No", "ID No"]);
    pub const AMOUNT: ColumnSpec = ColumnSpec::new(
        "incentive_amount",
        &["incentive_amount", "Final Incentive amount", "Incentive"],
    );
    pub const PART1_AMOUNT: ColumnSpec = ColumnSpec::new("part1_amount", &["part1_amount"]);
    pub const CLAIM_FREE_MONTHS: ColumnSpec =
        ColumnSpec::new("claim_free_months", &["claim_free_months"]);
}
