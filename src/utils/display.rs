use crate::rag::Dog;
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_prompt(text: &str) {
    print!("{}", text.yellow().bold());
}

pub fn print_dog(dog: &Dog) {
    let owner = match &dog.owner {
        Some(owner) => format!("adopted by {}", owner).dimmed(),
        None => "available".green(),
    };
    println!(
        "{:>4}  {}  {}\n      {}",
        dog.id.to_string().bright_black(),
        dog.name.bold(),
        owner,
        dog.description
    );
}
