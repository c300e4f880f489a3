use scalargrad::{dot, Graph};

fn main() {
    let graph = Graph::new();
    let a = graph.value(-4.0);
    let b = graph.value(2.0);
    let c = a + b; // -2
    let d = a * b + b.pow(3.0); // 0
    let e = (c - d).tanh();
    let f = 2.0f64 / (e * e + 1.0);
    let g = f + (a * 0.5).relu() - d;

    g.backward();
    println!("g = {}", g.data());
    println!("dg/da = {}", a.grad());
    println!("dg/db = {}", b.grad());

    // a second pass on the same graph accumulates, so reset first
    graph.zero_grad();
    e.backward();
    println!("de/da = {}", a.grad());
    println!("de/db = {}", b.grad());

    print!("{}", dot::render(&e, &dot::DotOptions::default()));
}
