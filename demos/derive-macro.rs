//! Deriving canonical strategies for custom types.

use crucible::*;
use tracing_subscriber::EnvFilter;

#[derive(Arbitrary, Debug, Clone, PartialEq)]
struct User {
    name: String,
    age: u32,
    active: bool,
}

#[derive(Arbitrary, Debug, Clone, PartialEq)]
struct Point(i32, i32);

#[derive(Arbitrary, Debug, Clone, PartialEq)]
enum Shape {
    Dot(Point),
    Segment { from: Point, to: Point },
    Polygon(Vec<Point>),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let seed = Seed::random_value();
    println!("Sampling with seed {seed}");
    let mut stream = ByteStream::generate(Vec::new(), Seed::from_u64(seed), 8 * 1024);

    for _ in 0..3 {
        match any::<User>().draw(&mut stream) {
            Ok(user) => println!("Generated User: {user:?}"),
            Err(e) => println!("Draw failed: {e}"),
        }
    }
    for _ in 0..3 {
        match any::<Shape>().draw(&mut stream) {
            Ok(shape) => println!("Generated Shape: {shape:?}"),
            Err(e) => println!("Draw failed: {e}"),
        }
    }
    println!();

    // Derived strategies shrink field by field.
    let prop = for_all(any::<User>(), |user| !(user.active && user.age > 65))
        .with_name("active users are under 65");
    match prop.run(&Config::default()) {
        Ok(_) => println!("Property passed"),
        Err(CrucibleError::PropertyFailed(failure)) => {
            println!("Property failed as expected: {failure}");
            println!("  Replay bytes: {:?}", failure.bytes);
        }
        Err(e) => println!("Property errored: {e}"),
    }

    let prop = for_all(any::<Shape>(), |shape| match shape {
        Shape::Polygon(points) => points.len() < 3,
        _ => true,
    });
    match prop.run(&Config::default()) {
        Ok(_) => println!("Shape property passed"),
        Err(e) => println!("Shape property failed as expected: {e}"),
    }
}
