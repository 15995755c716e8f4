//! Building the circuit DAG from a parsed circuit.

use qoc_ir::{CircuitDag, GateDurations, QubitId};

use crate::ast::ParsedCircuit;
use crate::error::{ParseError, ParseResult};

impl ParsedCircuit {
    /// Declare the wires in order and append one DAG gate per parsed gate.
    ///
    /// Gate `i` of the circuit becomes the `i`-th entry of the op table.
    /// Fails on a wire that was never declared and on an op-code missing
    /// from `durations`.
    pub fn into_dag(self, durations: GateDurations) -> ParseResult<CircuitDag> {
        let mut dag = CircuitDag::new(durations);
        for name in &self.qubits {
            dag.add_qubit(name.as_str())?;
        }

        for (gate_index, parsed) in self.gates.iter().enumerate() {
            let wires = parsed
                .wires
                .iter()
                .map(|name| {
                    dag.qubit_id(name)
                        .ok_or_else(|| ParseError::UndeclaredQubit {
                            name: name.clone(),
                            gate_index,
                            gate: parsed.source_text(),
                        })
                })
                .collect::<ParseResult<Vec<QubitId>>>()?;
            dag.push_op(parsed.gate, &wires)?;
        }

        Ok(dag)
    }
}

#[cfg(test)]
mod tests {
    use qoc_ir::{GateDurations, IrError, StandardGate};

    use crate::error::ParseError;
    use crate::parser::parse_circuit;

    #[test]
    fn test_into_dag_keeps_program_order() {
        let circuit = parse_circuit("qubit a\nqubit b\nH a\nCNOT a,b\nZ b").unwrap();
        let dag = circuit.into_dag(GateDurations::uniform(1.0)).unwrap();

        assert_eq!(dag.num_qubits(), 2);
        assert_eq!(dag.qubit_name(dag.qubit_id("b").unwrap()), Some("b"));
        let names: Vec<&str> = dag
            .op_tab()
            .iter()
            .map(|&g| dag.gate(g).unwrap().first_op().name())
            .collect();
        assert_eq!(names, vec!["H", "CNOT", "Z"]);
        let b = dag.qubit_id("b").unwrap();
        assert_eq!(dag.chain(b).len(), 2);
    }

    #[test]
    fn test_undeclared_wire() {
        let circuit = parse_circuit("qubit a\nX a\nCZ a,c").unwrap();
        let err = circuit.into_dag(GateDurations::uniform(1.0)).unwrap_err();
        match err {
            ParseError::UndeclaredQubit {
                name,
                gate_index,
                gate,
            } => {
                assert_eq!(name, "c");
                assert_eq!(gate_index, 1);
                assert_eq!(gate, "CZ a,c");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_duration() {
        let circuit = parse_circuit("qubit a\nT a").unwrap();
        let durations = GateDurations::new().with("H", 1.0).unwrap();
        let err = circuit.into_dag(durations).unwrap_err();
        assert!(matches!(
            err,
            ParseError::CircuitError(IrError::MissingDuration(ref name)) if name == "T"
        ));
    }

    #[test]
    fn test_rotation_survives_lowering() {
        let circuit = parse_circuit("qubit a\nRy -1.5 a").unwrap();
        let dag = circuit.into_dag(GateDurations::uniform(1.0)).unwrap();
        let gate = dag.gate(dag.op_tab()[0]).unwrap();
        assert_eq!(*gate.first_op().gate(), StandardGate::Ry(-1.5));
    }
}
