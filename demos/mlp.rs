use scalargrad::{Graph, Mlp};

fn main() -> scalargrad::Result<()> {
    let graph = Graph::new();
    let mlp = Mlp::with_seed(&graph, 3, &[4, 4, 1], 1337)?;

    let x = graph.values(&[2.0, 3.0, -1.0]);
    let out = mlp.forward(&x)?[0];
    let loss = (out - 1.0).pow(2.0);
    loss.backward();

    println!("output = {:.6}", out.data());
    println!("loss = {:.6}", loss.data());
    for (i, p) in mlp.parameters().iter().enumerate() {
        println!("param {:2}: data {:+.4} grad {:+.4}", i, p.data(), p.grad());
    }
    Ok(())
}
