//! Interactive prompting: small stdin helpers plus the database-id and
//! filter selection flows. All filter semantics live in the core
//! [`FilterBuilder`]; this module only feeds it user input and re-prompts on
//! invalid entries. User input errors are never fatal.

use std::io::{self, Write};

use notion_docx_core::filter::{FilterBuilder, FilterExpression, NumberOperator};
use notion_docx_core::notion::{DatabaseSchema, PropertyType};

/// Print a message and read one trimmed line from stdin.
pub fn prompt_line(message: &str) -> io::Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_nonempty(message: &str) -> io::Result<String> {
    loop {
        let value = prompt_line(message)?;
        if !value.is_empty() {
            return Ok(value);
        }
        println!("A value is required.");
    }
}

fn prompt_float(message: &str) -> io::Result<f64> {
    loop {
        match prompt_line(message)?.parse() {
            Ok(value) => return Ok(value),
            Err(_) => println!("Invalid number input. Please enter a numeric value."),
        }
    }
}

/// Pick a database id: from history by number, or freshly entered.
pub fn choose_database_id(history: &[String]) -> io::Result<String> {
    if history.is_empty() {
        return prompt_nonempty("Enter Notion Database ID: ");
    }
    println!("\nPrevious Database IDs:");
    for (i, id) in history.iter().enumerate() {
        println!("{}. {id}", i + 1);
    }
    loop {
        let choice =
            prompt_line("Enter number to use a previous Database ID, or 'n' for new: ")?
                .to_lowercase();
        if choice == "n" {
            return prompt_nonempty("Enter new Notion Database ID: ");
        }
        match choice.parse::<usize>() {
            Ok(index) if (1..=history.len()).contains(&index) => {
                let id = history[index - 1].clone();
                println!("Using selected Database ID: {id}");
                return Ok(id);
            }
            _ => println!("Invalid input. Please enter a number or 'n'."),
        }
    }
}

/// Pick a filter: a previous one from history (revalidated against the
/// current schema) or a newly built one. `None` means no filter.
pub fn choose_filter(
    schema: &DatabaseSchema,
    history: &[FilterExpression],
) -> io::Result<Option<FilterExpression>> {
    if !history.is_empty() {
        println!("\nPrevious filter configurations:");
        for (i, filter) in history.iter().enumerate() {
            println!("{}. {}", i + 1, filter.summary());
        }
        loop {
            let choice =
                prompt_line("Enter number to use a previous filter, or 'n' for new filters: ")?
                    .to_lowercase();
            if choice == "n" {
                break;
            }
            match choice.parse::<usize>() {
                Ok(index) if (1..=history.len()).contains(&index) => {
                    let filter = &history[index - 1];
                    if let Err(e) = filter.validate(schema) {
                        println!("This filter no longer matches the database: {e}");
                        continue;
                    }
                    println!("Using selected filter: {}", filter.summary());
                    return Ok(Some(filter.clone()));
                }
                _ => println!("Invalid input. Please enter a number or 'n'."),
            }
        }
    }
    build_filter(schema)
}

fn build_filter(schema: &DatabaseSchema) -> io::Result<Option<FilterExpression>> {
    let mut builder = FilterBuilder::new(schema.clone());
    loop {
        if !builder.is_empty() {
            println!("\nCurrent filters:");
            for (property, summary) in builder.collected() {
                println!("- {property}: {summary}");
            }
            println!("{}", "-".repeat(40));
        }

        let choice = prompt_line("Do you want to add another filter? (yes/no): ")?.to_lowercase();
        match choice.as_str() {
            "yes" => collect_condition(&mut builder)?,
            "no" => {
                // The builder state machine moves to Confirming here; both
                // calls below can only fail on out-of-order use.
                let summary = builder
                    .finish_collecting()
                    .expect("builder is collecting a property between conditions");
                let Some(summary) = summary else {
                    println!("No filters added. Proceeding without filters.");
                    return Ok(builder.confirm().expect("builder is confirming"));
                };
                println!("\nSummary of all filters to be applied (AND-ed between properties, OR-ed within same property):");
                println!("- {summary}");
                let confirmed = prompt_line("Confirm these filters? (yes/no): ")?.to_lowercase();
                if confirmed == "yes" {
                    return Ok(builder.confirm().expect("builder is confirming"));
                }
                println!("Restarting filter selection...");
                builder.restart().expect("builder is confirming");
            }
            _ => println!("Invalid choice. Please enter 'yes' or 'no'."),
        }
    }
}

fn collect_condition(builder: &mut FilterBuilder) -> io::Result<()> {
    let name = prompt_line(
        "Enter property name to filter on (e.g., 'Priority', 'STATUS', 'Estimation'): ",
    )?;
    let property_type = match builder.select_property(&name) {
        Ok(property_type) => property_type,
        Err(e) => {
            println!("Error: {e}. Please choose from available properties.");
            return Ok(());
        }
    };

    match property_type {
        PropertyType::Select | PropertyType::Status => {
            let values = prompt_nonempty(&format!(
                "Enter comma-separated values for '{name}' (e.g., 'Mid, High', 'Refinement, Done'): "
            ))?;
            if let Err(e) = builder.provide_values(&values) {
                println!("Error: {e}");
                return Ok(());
            }
        }
        PropertyType::MultiSelect => {
            let values = prompt_nonempty(&format!(
                "Enter comma-separated values for '{name}' (e.g., '10h, 20h'): "
            ))?;
            if let Err(e) = builder.provide_values(&values) {
                println!("Error: {e}");
                return Ok(());
            }
        }
        PropertyType::Number => {
            let operator = loop {
                let raw = prompt_line(&format!(
                    "Enter number filter type for '{name}' (equals, greater_than, less_than, greater_than_or_equal_to, less_than_or_equal_to, between): "
                ))?;
                match raw.parse::<NumberOperator>() {
                    Ok(operator) => break operator,
                    Err(e) => println!("Error: {e}"),
                }
            };
            builder
                .select_number_operator(operator)
                .expect("builder is collecting an operator");
            if operator == NumberOperator::Between {
                let low = prompt_float("Enter start value: ")?;
                let high = prompt_float("Enter end value: ")?;
                builder
                    .provide_range(low, high)
                    .expect("builder is collecting a range");
            } else {
                let value = prompt_float(&format!("Enter value for '{name}': "))?;
                builder
                    .provide_number(value)
                    .expect("builder is collecting a number");
            }
        }
        // select_property only admits the four filterable types above plus
        // checkbox.
        PropertyType::Checkbox => loop {
            let raw = prompt_line(&format!("Enter 'true' or 'false' for '{name}': "))?
                .to_lowercase();
            match raw.as_str() {
                "true" => {
                    builder
                        .provide_checkbox(true)
                        .expect("builder is collecting a checkbox value");
                    break;
                }
                "false" => {
                    builder
                        .provide_checkbox(false)
                        .expect("builder is collecting a checkbox value");
                    break;
                }
                _ => println!("Invalid input for checkbox. Please enter 'true' or 'false'."),
            }
        },
        PropertyType::Title | PropertyType::Other(_) => unreachable!(
            "select_property rejects property types without filter support"
        ),
    }

    println!("Filter added.");
    Ok(())
}
