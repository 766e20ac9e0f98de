/// Instruction sent ahead of every question.
///
/// The schema is fixed: a single `STUDENTS` table with `NAME`, `CLASS`,
/// `Marks` and `Company` columns. The closing line asks the model for bare
/// SQL; nothing downstream enforces that.
pub const PROMPT_TEMPLATE: &str = r#"
You are an expert in converting English questions to SQL query!
The SQL database has the name STUDENTS and has the following columns - NAME, CLASS,
Marks, Company

For example,
Example 1 - How many entries of records are present?,
the SQL command will be something like this SELECT COUNT(*) FROM STUDENTS ;

Example 2 - Tell me all the students studying in MCA class?,
the SQL command will be something like this SELECT * FROM STUDENTS
where CLASS="MCA";
also the sql code should not have ``` in beginning or end and sql word in output
"#;
